//! Password and profile photo commands

use super::signed_in;
use crate::cli::args::{PasswordArgs, PhotoArgs};
use crate::config::Config;
use crate::error::FeedResult;
use crate::model::{ImageUpload, PasswordChange};
use crate::ui::{self, TaskSpinner, UiContext, UploadProgress};

/// Execute the password command
pub async fn password(args: PasswordArgs, config: &Config) -> FeedResult<()> {
    let ctx = UiContext::detect();

    let current = match args.current {
        Some(current) => current,
        None => ui::password(&ctx, "Current password", "--current").await?,
    };
    let (new, confirm) = match args.new_password {
        Some(new) => (new.clone(), new),
        None => (
            ui::password(&ctx, "New password", "--new").await?,
            ui::password(&ctx, "Confirm new password", "--new").await?,
        ),
    };
    let change = PasswordChange {
        current,
        new,
        confirm,
    };
    change.validate()?;

    let (app, _) = signed_in(config).await?;
    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start("Changing password...");
    if let Err(e) = app.coordinator.change_password(&change).await {
        spinner.stop_error("Password unchanged");
        return Err(e);
    }
    spinner.stop("Password changed");
    Ok(())
}

/// Execute the photo command
pub async fn photo(args: PhotoArgs, config: &Config) -> FeedResult<()> {
    let ctx = UiContext::detect();
    let upload = ImageUpload::from_path(&args.path).await?;
    upload.check_size(config.upload.max_photo_bytes)?;

    let (app, _) = signed_in(config).await?;
    let progress = UploadProgress::new(&ctx, &upload.filename, upload.bytes.len() as u64);
    let result = app.coordinator.upload_photo(&upload).await;
    progress.finish();
    result?;

    ui::step_ok_detail(&ctx, "Profile photo updated", &upload.filename);
    Ok(())
}
