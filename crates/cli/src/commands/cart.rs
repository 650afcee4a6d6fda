//! Cart commands.

use duodude_core::{LineKey, ProductId, Quantity};

use super::{CartAction, CommandError, print_cart, print_json};
use crate::context::Context;

pub async fn run(ctx: &Context, action: CartAction, json: bool) -> Result<(), CommandError> {
    let cart = match action {
        CartAction::Show => ctx.cart.snapshot().await?,
        CartAction::Add {
            product,
            quantity,
            size,
        } => {
            let quantity = Quantity::new(quantity)
                .ok_or_else(|| CommandError::InvalidArgument("quantity must be at least 1".into()))?;
            let product = ctx.catalog.get_product(&ProductId::new(product)).await?;
            if !product.offers_size(size.as_deref()) {
                return Err(CommandError::InvalidArgument(format!(
                    "{} is not offered in size {} (available: {})",
                    product.name,
                    size.as_deref().unwrap_or_default(),
                    product.sizes.join(", "),
                )));
            }
            ctx.cart.add_line(product, quantity, size).await?
        }
        CartAction::Remove { product, size } => {
            ctx.cart
                .remove_line(&LineKey::new(ProductId::new(product), size))
                .await?
        }
        CartAction::Set {
            product,
            quantity,
            size,
        } => {
            ctx.cart
                .set_quantity(&LineKey::new(ProductId::new(product), size), quantity)
                .await?
        }
        CartAction::Clear => {
            ctx.cart.clear().await?;
            ctx.cart.snapshot().await?
        }
    };

    if json {
        print_json(&cart)
    } else {
        print_cart(&cart);
        Ok(())
    }
}
