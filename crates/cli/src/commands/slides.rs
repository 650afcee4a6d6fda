//! Hero slide commands for administrators.

use duodude_core::{HeroSlide, SlideDraft, SlideId};

use super::{CommandError, SlidesAction, print_json};
use crate::context::Context;

pub async fn run(ctx: &Context, action: SlidesAction, json: bool) -> Result<(), CommandError> {
    let auth = ctx.auth();
    let token = auth.credential().ok_or(CommandError::NotSignedIn)?;

    let slides = match action {
        SlidesAction::List => ctx.slides.all_slides(token).await?,
        SlidesAction::Add {
            title,
            subtitle,
            image,
            order,
        } => {
            let draft = SlideDraft {
                title,
                subtitle,
                image,
                order,
                ..SlideDraft::default()
            };
            vec![ctx.slides.create_slide(token, &draft).await?]
        }
        SlidesAction::Move { id, order } => {
            vec![ctx.slides.move_slide(token, &SlideId::new(id), order).await?]
        }
        SlidesAction::Toggle { id } => vec![ctx.slides.toggle_slide(token, &SlideId::new(id)).await?],
        SlidesAction::Remove { id } => {
            let id = SlideId::new(id);
            ctx.slides.delete_slide(token, &id).await?;
            print_deleted(&id);
            return Ok(());
        }
    };

    if json {
        return print_json(&slides);
    }
    print_slides(&slides);
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_slides(slides: &[HeroSlide]) {
    for slide in slides {
        let shown = if slide.is_active { "shown" } else { "hidden" };
        println!(
            "{:<24} #{:<3} {:<7} {}",
            slide.id.as_str(),
            slide.order,
            shown,
            slide.title
        );
    }
}

#[allow(clippy::print_stdout)]
fn print_deleted(id: &SlideId) {
    println!("Slide {id} deleted.");
}
