//! Sign in, sign out, session info, and profile changes.

use duodude_core::{AddressId, SavedAddress, User};
use duodude_storefront::api::ProfileUpdate;
use duodude_storefront::auth::AuthToken;
use duodude_storefront::cart::Reconciliation;
use secrecy::SecretString;
use tracing::info;

use super::{AccountAction, CommandError, print_addresses, print_json};
use crate::context::Context;

/// Sign in and move the guest cart into the account cart.
#[allow(clippy::print_stdout)]
pub async fn login(ctx: &Context, token: String) -> Result<(), CommandError> {
    let token = AuthToken::new(token);

    // Load the cart under the current session first, so the switch to the
    // new credential is seen as a sign-in and migrates guest lines.
    ctx.cart.initialize().await?;

    let user = ctx.users.me(&token).await?;
    ctx.session.login(user, token).await?;

    let outcome = ctx.cart.reconcile().await?;
    let auth = ctx.auth();
    if let Some(user) = auth.user() {
        println!("Signed in as {} <{}>", user.name, user.email);
        if user.is_admin() {
            println!("Admin dashboard: {}", auth.redirect_path());
        }
    }

    match outcome {
        Reconciliation::Migrated { lines } if lines > 0 => {
            info!(lines, "Guest cart moved to account");
            println!("Moved {lines} cart line(s) into your account.");
        }
        Reconciliation::Degraded => {
            println!("The server rejected the token; your cart stays on this device.");
        }
        _ => {}
    }
    Ok(())
}

/// Sign out. The account cart is left on the server.
#[allow(clippy::print_stdout)]
pub async fn logout(ctx: &Context) -> Result<(), CommandError> {
    if !ctx.auth().is_authenticated() {
        println!("Not signed in.");
        return Ok(());
    }

    ctx.session.logout().await?;
    ctx.cart.reconcile().await?;
    println!("Signed out.");
    Ok(())
}

/// Show the signed-in user.
#[allow(clippy::print_stdout)]
pub fn whoami(ctx: &Context, json: bool) -> Result<(), CommandError> {
    let auth = ctx.auth();
    let user = auth.user().ok_or(CommandError::NotSignedIn)?;

    if json {
        return print_json(user);
    }

    println!("{} <{}>", user.name, user.email);
    println!("Id:   {}", user.id);
    println!("Role: {}", user.role);
    if let Some(address) = user.default_shipping_address() {
        println!(
            "Ships to: {}, {} {}, {}",
            address.street, address.city, address.zip, address.country
        );
    }
    Ok(())
}

/// Profile, address book, and account listing.
#[allow(clippy::print_stdout)]
pub async fn run(ctx: &Context, action: AccountAction, json: bool) -> Result<(), CommandError> {
    let auth = ctx.auth();
    let (Some(user), Some(token)) = (auth.user(), auth.credential()) else {
        return Err(CommandError::NotSignedIn);
    };

    let updated = match action {
        AccountAction::Update {
            name,
            email,
            password,
        } => {
            let update = ProfileUpdate {
                name: name.unwrap_or_else(|| user.name.clone()),
                email: email.unwrap_or_else(|| user.email.clone()),
                password: password.map(SecretString::from),
            };
            ctx.users.update_profile(token, &update).await?
        }
        AccountAction::Addresses => {
            // Saved session may be stale; ask the backend
            let me = ctx.users.me(token).await?;
            return show_addresses(&me, json);
        }
        AccountAction::AddAddress {
            kind,
            street,
            city,
            state,
            zip,
            country,
            default,
        } => {
            let address = SavedAddress {
                id: None,
                kind,
                street,
                city,
                state,
                zip_code: zip,
                country,
                is_default: default,
            };
            ctx.users.add_address(token, &address).await?
        }
        AccountAction::RemoveAddress { id } => {
            ctx.users.delete_address(token, &AddressId::new(id)).await?
        }
        AccountAction::Users => {
            let users = ctx.users.all_users(token).await?;
            if json {
                return print_json(&users);
            }
            for user in &users {
                println!(
                    "{:<24} {:<6} {} <{}>",
                    user.id.as_str(),
                    user.role.to_string(),
                    user.name,
                    user.email
                );
            }
            return Ok(());
        }
    };

    ctx.session.refresh_user(updated.clone()).await?;
    if json {
        return print_json(&updated);
    }
    println!("Saved. {} <{}>", updated.name, updated.email);
    print_addresses(&updated.addresses);
    Ok(())
}

fn show_addresses(user: &User, json: bool) -> Result<(), CommandError> {
    if json {
        return print_json(&user.addresses);
    }
    print_addresses(&user.addresses);
    Ok(())
}
