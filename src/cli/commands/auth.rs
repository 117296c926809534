//! Login, signup, logout and whoami

use crate::app::App;
use crate::cli::args::{LoginArgs, SignupArgs};
use crate::config::Config;
use crate::error::{FeedError, FeedResult};
use crate::model::{Gender, LoginForm, SignupForm};
use crate::ui::{self, TaskSpinner, UiContext};

/// Execute the login command
pub async fn login(args: LoginArgs, config: &Config) -> FeedResult<()> {
    let ctx = UiContext::detect();

    let email = match args.email {
        Some(email) => email,
        None => ui::input(&ctx, "Email", "you@example.com", "--email").await?,
    };
    let password = match args.password {
        Some(password) => password,
        None => ui::password(&ctx, "Password", "--password").await?,
    };
    let form = LoginForm { email, password };
    // Reject a malformed form before touching the session file
    form.validate()?;

    let app = App::bootstrap(config).await?;
    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start("Signing in...");
    if let Err(e) = app.coordinator.login(&form).await {
        spinner.stop_error("Sign in failed");
        return Err(e);
    }
    spinner.stop(&format!("Signed in as {}", form.email.trim()));
    Ok(())
}

/// Execute the signup command
pub async fn signup(args: SignupArgs, config: &Config) -> FeedResult<()> {
    let ctx = UiContext::detect();
    ui::intro(&ctx, "Create an account");

    let name = match args.name {
        Some(name) => name,
        None => ui::input(&ctx, "Name", "Ada Lovelace", "--name").await?,
    };
    let email = match args.email {
        Some(email) => email,
        None => ui::input(&ctx, "Email", "you@example.com", "--email").await?,
    };
    let (password, re_password) = match args.password {
        Some(password) => (password.clone(), password),
        None => (
            ui::password(&ctx, "Password", "--password").await?,
            ui::password(&ctx, "Repeat password", "--password").await?,
        ),
    };
    let date_of_birth = match args.date_of_birth {
        Some(date) => date,
        None => ui::input(&ctx, "Date of birth", "1990-04-21", "--date-of-birth").await?,
    };
    let gender = match args.gender {
        Some(gender) => gender.into(),
        None if ctx.is_interactive() => {
            ui::select(
                &ctx,
                "Gender",
                &[(Gender::Male, "male", ""), (Gender::Female, "female", "")],
            )
            .await?
        }
        None => {
            return Err(FeedError::User(
                "--gender is required when not running interactively".to_string(),
            ))
        }
    };

    let form = SignupForm {
        name,
        email,
        password,
        re_password,
        date_of_birth,
        gender,
    };
    form.validate()?;

    let app = App::bootstrap(config).await?;
    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start("Registering...");
    if let Err(e) = app.coordinator.signup(&form).await {
        spinner.stop_error("Registration failed");
        return Err(e);
    }
    spinner.stop("Account created");
    ui::outro_success(&ctx, "Run: linkpost login");
    Ok(())
}

/// Execute the logout command
pub async fn logout(config: &Config) -> FeedResult<()> {
    let ctx = UiContext::detect();
    let app = App::bootstrap(config).await?;

    if !app.session.is_authenticated() {
        ui::step_info(&ctx, "Not logged in");
        return Ok(());
    }
    app.coordinator.logout().await?;
    ui::step_ok(&ctx, "Logged out");
    Ok(())
}

/// Execute the whoami command
pub async fn whoami(config: &Config) -> FeedResult<()> {
    let ctx = UiContext::detect();
    let app = App::bootstrap(config).await?;

    if !app.session.is_authenticated() {
        ui::step_warn_hint(&ctx, "Not logged in", "Run: linkpost login");
        return Ok(());
    }

    ui::section(&ctx, "Session");
    match app.session.current_user_id() {
        Some(id) => ui::key_value(&ctx, "User id", id.as_str()),
        None => ui::key_value(&ctx, "User id", "unknown (token carries no user claim)"),
    }
    ui::key_value(&ctx, "Stored at", &app.session.path().display().to_string());
    ui::key_value(&ctx, "Server", &config.api.base_url);
    Ok(())
}
