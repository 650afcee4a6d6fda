//! Order commands.

use duodude_core::{Order, OrderId, OrderStatus, ReturnRequest, ShippingAddress, format_price};
use duodude_storefront::checkout;

use super::{CommandError, OrdersAction, print_json};
use crate::context::Context;

pub async fn run(ctx: &Context, action: OrdersAction, json: bool) -> Result<(), CommandError> {
    let auth = ctx.auth();
    let (Some(user), Some(token)) = (auth.user(), auth.credential()) else {
        return Err(CommandError::NotSignedIn);
    };

    match action {
        OrdersAction::List => {
            let orders = if user.is_admin() {
                ctx.orders.all_orders(token).await?
            } else {
                ctx.orders.my_orders(token).await?
            };
            if json {
                print_json(&orders)
            } else {
                print_orders(&orders);
                Ok(())
            }
        }
        OrdersAction::Place {
            name,
            street,
            city,
            zip,
            country,
        } => {
            // Fill gaps from the default saved address
            let saved = user.default_shipping_address().unwrap_or_default();
            let address = ShippingAddress {
                name: name.unwrap_or(saved.name),
                street: street.unwrap_or(saved.street),
                city: city.unwrap_or(saved.city),
                zip: zip.unwrap_or(saved.zip),
                country: country.unwrap_or(saved.country),
            };
            if !address.is_complete() {
                return Err(CommandError::InvalidArgument(
                    "shipping address needs --name, --street, --city, --zip and --country \
                     (or a default saved address)"
                        .to_string(),
                ));
            }

            let order = checkout::place_order(&ctx.cart, &ctx.orders, &auth, &address).await?;
            if json {
                print_json(&order)
            } else {
                print_orders(std::slice::from_ref(&order));
                Ok(())
            }
        }
        OrdersAction::Cancel { id } => {
            let id = OrderId::new(id);
            ctx.orders.cancel_order(token, &id).await?;
            print_cancelled(&id);
            Ok(())
        }
        OrdersAction::Return { id, reason } => {
            let id = OrderId::new(id);
            let order = ctx
                .orders
                .my_orders(token)
                .await?
                .into_iter()
                .find(|order| order.id == id)
                .ok_or_else(|| CommandError::InvalidArgument(format!("no order {id}")))?;
            if order.status != OrderStatus::Delivered {
                return Err(CommandError::InvalidArgument(format!(
                    "order {id} is {}; only delivered orders can be returned",
                    order.status
                )));
            }

            ctx.orders
                .request_return(token, &ReturnRequest::whole_order(&order, reason))
                .await?;
            print_return_requested(&id);
            Ok(())
        }
    }
}

#[allow(clippy::print_stdout)]
fn print_orders(orders: &[Order]) {
    if orders.is_empty() {
        println!("No orders yet.");
    }
    for order in orders {
        let placed = order
            .created_at
            .map_or_else(String::new, |at| at.format("%Y-%m-%d").to_string());
        println!(
            "{:<24} {:<10} {:<11} {:>3} item(s) {:>12}",
            order.id.as_str(),
            placed,
            order.status.to_string(),
            order.item_count(),
            format_price(order.total),
        );
    }
}

#[allow(clippy::print_stdout)]
fn print_cancelled(id: &OrderId) {
    println!("Order {id} cancelled.");
}

#[allow(clippy::print_stdout)]
fn print_return_requested(id: &OrderId) {
    println!("Return requested for order {id}. It awaits admin approval.");
}
