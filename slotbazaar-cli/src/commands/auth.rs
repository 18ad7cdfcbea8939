//! Account commands - register, login, logout, refresh, whoami

use anyhow::Result;
use colored::Colorize;
use serde_json::json;
use slotbazaar_core::domain::Registration;
use slotbazaar_core::User;

use super::{get_context, password_or_prompt, print_json, value_or_prompt};
use crate::output;

pub fn register(
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
    json: bool,
) -> Result<()> {
    let ctx = get_context()?;
    let username = value_or_prompt(username, "Username")?;
    let email = value_or_prompt(email, "Email")?;
    let password = password_or_prompt(password, true)?;

    let (user, session) = ctx
        .auth_service
        .register(&Registration::new(username, email, password))?;

    if json {
        return print_json(json!({ "user": user, "username": session.username }));
    }
    output::success(&format!("Welcome to SlotBazaar, {}!", user.username));
    println!("Starting balance: {}", output::money(user.balance).bold());
    Ok(())
}

pub fn login(username: Option<String>, password: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let username = value_or_prompt(username, "Username")?;
    let password = password_or_prompt(password, false)?;

    let session = ctx.auth_service.login(&username, &password)?;

    if json {
        return print_json(json!({ "username": session.username, "issued_at": session.issued_at }));
    }
    output::success(&format!("Logged in as {}", session.username));
    Ok(())
}

pub fn logout() -> Result<()> {
    let ctx = get_context()?;
    if ctx.auth_service.logout()? {
        output::success("Logged out");
    } else {
        output::info("You were not logged in.");
    }
    Ok(())
}

pub fn refresh() -> Result<()> {
    let ctx = get_context()?;
    let session = ctx.auth_service.refresh()?;
    output::success(&format!("Session renewed for {}", session.username));
    Ok(())
}

pub fn whoami(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let user = ctx.auth_service.current_user()?;

    if json {
        return print_json(&user);
    }
    print_user(&user);
    Ok(())
}

fn print_user(user: &User) {
    let mut table = output::create_table();
    table.add_row(vec!["Username".to_string(), user.username.clone()]);
    table.add_row(vec!["Email".to_string(), user.email.clone()]);
    table.add_row(vec!["Balance".to_string(), output::money(user.balance)]);
    table.add_row(vec![
        "Member since".to_string(),
        user.created_at.format("%Y-%m-%d").to_string(),
    ]);
    if let Some(last) = user.last_login {
        table.add_row(vec!["Last login".to_string(), last.format("%Y-%m-%d %H:%M").to_string()]);
    }
    if !user.is_active {
        table.add_row(vec!["Status".to_string(), "disabled".red().to_string()]);
    }
    println!("{}", table);
}
