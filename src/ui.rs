// UI layer: the interactive flows behind each command, using `dialoguer`
// for input and `indicatif` for progress. Decisions are delegated to
// `select`; requests go through `account` and `hosting`.

use crate::account;
use crate::api::ApiClient;
use crate::config::{Config, ConfigValues};
use crate::hosting::server::{self, ServerAction};
use crate::hosting::{Deployer, DeployTarget, ProgressSink};
use crate::logging::Logging;
use crate::models::{App, SessionInfo};
use crate::select::{self, AppChoice, DeployScope, SubdomainOutcome};
use crate::session::SessionStore;
use anyhow::{bail, Context as _, Result};
use dialoguer::{Input, Password, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Everything a command needs, built once in `main`.
pub struct Context {
    pub api: ApiClient,
    pub sessions: SessionStore,
    /// Directory holding `appstax.conf`.
    pub project_dir: PathBuf,
    pub logging: Logging,
}

impl Context {
    /// Build the client from the project's config and attach any stored
    /// session.
    pub fn new(project_dir: PathBuf, sessions: SessionStore, logging: Logging) -> Result<Self> {
        let config = Config::read(&project_dir)?;
        let configured = Some(config.api_base_url.as_str()).filter(|s| !s.is_empty());
        let mut api = ApiClient::from_env(configured).context("Failed to build HTTP client")?;
        api.set_app_key(&config.app_key);
        if let Some(session) = sessions.load()? {
            api.set_session(&session.session_id);
        }
        Ok(Context {
            api,
            sessions,
            project_dir,
            logging,
        })
    }

    fn config(&self) -> Result<Config> {
        Ok(Config::read(&self.project_dir)?)
    }

    fn require_config(&self) -> Result<Config> {
        if !Config::exists(&self.project_dir) {
            bail!("Can't find appstax.conf. Run 'appstax init' to initialize before deploying.");
        }
        self.config()
    }
}

fn spinner(message: &str) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}

/// Collect credentials, log in and persist the session.
pub fn login(ctx: &mut Context) -> Result<SessionInfo> {
    let email: String = Input::new().with_prompt("Email").interact_text()?;
    let password: String = Password::new().with_prompt("Password").interact()?;

    let spinner = spinner("Logging in...")?;
    let session = account::login(&ctx.api, &email, &password);
    spinner.finish_and_clear();
    let session = session.context("Login failed")?;

    ctx.sessions.save(&session)?;
    ctx.api.set_session(&session.session_id);
    println!("Welcome!");
    Ok(session)
}

pub fn signup(ctx: &mut Context) -> Result<SessionInfo> {
    let first: String = Input::new().with_prompt("First name").interact_text()?;
    let last: String = Input::new().with_prompt("Last name").interact_text()?;
    let email: String = Input::new().with_prompt("Email").interact_text()?;
    let password: String = Password::new()
        .with_prompt("Password")
        .with_confirmation("Repeat password", "Passwords don't match")
        .interact()?;

    let spinner = spinner("Creating account...")?;
    let session = account::signup(&ctx.api, &first, &last, &email, &password);
    spinner.finish_and_clear();
    let session = session.context("Signup failed")?;

    ctx.sessions.save(&session)?;
    ctx.api.set_session(&session.session_id);
    println!("Account created. You are now logged in.");
    Ok(session)
}

pub fn logout(ctx: &Context) -> Result<()> {
    ctx.sessions.clear()?;
    println!("Logged out.");
    Ok(())
}

fn login_if_needed(ctx: &mut Context) -> Result<SessionInfo> {
    match ctx.sessions.load()? {
        Some(session) => Ok(session),
        None => {
            println!("Please log in first.");
            login(ctx)
        }
    }
}

pub fn info(ctx: &mut Context) -> Result<()> {
    let session = login_if_needed(ctx)?;
    let user = account::get_user(&ctx.api, &session.user_id)?;
    println!("Logged in as {} {} <{}>", user.first_name, user.last_name, user.email);
    println!("Backend:    {}", ctx.api.base_url());

    let config = ctx.config()?;
    if config.app_key.is_empty() {
        println!("No app configured in this directory.");
        return Ok(());
    }
    let app = account::get_current_app(&ctx.api, &session.user_id, &config.app_key)?;
    println!("App:        {}", app.app_name);
    println!("App key:    {}", app.app_key);
    println!("Public dir: {}", config.public_dir);
    println!("Server dir: {}", config.server_dir);
    let url = account::format_hosting_url(&app);
    if !url.is_empty() {
        println!("Hosting:    {}", url);
    }
    Ok(())
}

/// Pick or create an app, write `appstax.conf`, create the public
/// directory and configure a hosting subdomain.
pub fn init(ctx: &mut Context) -> Result<()> {
    let session = login_if_needed(ctx)?;
    let app = select_app(ctx, &session)?;

    let input: String = Input::new()
        .with_prompt("Select deployable directory [default: ./public]")
        .allow_empty(true)
        .interact_text()?;
    let public_dir = select::public_dir_or_default(&input);

    let current = ctx.config()?;
    let config = Config::write(
        &ctx.project_dir,
        &ConfigValues {
            app_key: app.app_key.clone(),
            public_dir,
            server_dir: current.server_dir,
        },
    )?;
    ctx.api.set_app_key(&config.app_key);

    let public_path = config.public_path(&ctx.project_dir);
    if public_path.exists() {
        tracing::debug!("Not creating public directory. '{}' already exists.", public_path.display());
    } else {
        std::fs::create_dir_all(&public_path)
            .with_context(|| format!("Failed to create {}", public_path.display()))?;
        tracing::debug!("Created public directory '{}'", public_path.display());
    }

    select_subdomain(ctx, &app.app_id)?;

    println!("All done!");
    println!("Now run 'appstax deploy' when you are ready to upload your public files.");
    Ok(())
}

fn select_app(ctx: &Context, session: &SessionInfo) -> Result<App> {
    let apps = account::get_user_apps(&ctx.api, &session.user_id)?;
    if apps.is_empty() {
        println!("You have not created any apps yet! Create one now:");
        return create_app(ctx, session);
    }

    println!("Choose which app to configure or create a new one:");
    let items = select::app_menu_items(apps.iter().map(|a| a.app_name.as_str()));
    loop {
        let selected = Select::new().items(&items).default(0).interact()?;
        match select::choose_app(apps.len(), selected) {
            Some(AppChoice::Existing(i)) => return Ok(apps[i].clone()),
            Some(AppChoice::CreateNew) => return create_app(ctx, session),
            None => continue,
        }
    }
}

fn create_app(ctx: &Context, session: &SessionInfo) -> Result<App> {
    let app_name: String = Input::new().with_prompt("App name").interact_text()?;
    let app_description: String = Input::new()
        .with_prompt("Description")
        .allow_empty(true)
        .interact_text()?;
    let app = App {
        app_name,
        app_description,
        account_id: session.account_id.clone(),
        payment_plan: "PROTOTYPE".into(),
        ..Default::default()
    };
    let app = account::save_new_app(&ctx.api, &app).context("Could not create app")?;
    println!("Successfully created app '{}'", app.app_name);
    Ok(app)
}

fn select_subdomain(ctx: &Context, app_id: &str) -> Result<()> {
    let mut app = account::get_app_by_id(&ctx.api, app_id)?;
    loop {
        let subdomain: String = Input::new()
            .with_prompt("Choose a *.appstax.io subdomain for web hosting")
            .interact_text()?;
        app.hosting_subdomain = subdomain.trim().to_string();

        let saved = account::save_app(&ctx.api, &app);
        let cors = account::add_cors_origin(
            &ctx.api,
            app_id,
            &select::hosting_origin(&app.hosting_subdomain),
        );
        match select::subdomain_outcome(saved, cors) {
            SubdomainOutcome::Configured => {
                println!("Successfully configured {}.appstax.io", app.hosting_subdomain);
                return Ok(());
            }
            SubdomainOutcome::Retry(errors) => {
                for e in errors {
                    println!("{}", e);
                }
            }
        }
    }
}

fn select_subdomain_if_needed(ctx: &Context, session: &SessionInfo, app_key: &str) -> Result<()> {
    let app = account::get_current_app(&ctx.api, &session.user_id, app_key)?;
    if app.hosting_subdomain.is_empty() {
        select_subdomain(ctx, &app.app_id)?;
    }
    Ok(())
}

/// Upload progress on an indicatif bar, sized once the archive is known.
struct UploadBar(ProgressBar);

impl ProgressSink for UploadBar {
    fn on_start(&self, total_bytes: u64) {
        self.0.set_length(total_bytes);
    }

    fn on_progress(&self, bytes_sent: u64) {
        self.0.set_position(bytes_sent);
    }
}

/// Package and upload the configured directories.
pub fn deploy(ctx: &mut Context, scope: DeployScope) -> Result<()> {
    let config = ctx.require_config()?;
    let session = login_if_needed(ctx)?;

    let server_path = config.server_path(&ctx.project_dir);
    for target in select::deploy_targets(scope, &server_path) {
        let root = match target {
            DeployTarget::Static => config.public_path(&ctx.project_dir),
            DeployTarget::Server => server_path.clone(),
        };

        let bar = ProgressBar::new_spinner();
        bar.set_style(ProgressStyle::with_template(
            "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%, {bytes_per_sec})",
        )?);
        bar.set_message(format!("Uploading {}...", target));
        let progress: Arc<dyn ProgressSink> = Arc::new(UploadBar(bar.clone()));

        let deployer = Deployer::new(&ctx.api);
        let result = deployer.deploy(target, &root, progress);
        bar.finish_and_clear();
        let report = result.with_context(|| {
            format!(
                "Deploying {} failed (details in {})",
                target,
                ctx.logging.path().display()
            )
        })?;
        println!(
            "Deployed {} files of {} ({} bytes compressed).",
            report.entries, target, report.archive_size
        );
    }

    if scope != DeployScope::Server {
        let app = account::get_current_app(&ctx.api, &session.user_id, &config.app_key)?;
        let url = account::format_hosting_url(&app);
        if !url.is_empty() {
            println!("Your app is live at {}", url);
        }
    }
    Ok(())
}

/// Subcommands of `appstax server`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerOp {
    Create,
    Delete,
    Status,
    Start,
    Stop,
    Log(Option<String>),
}

pub fn server(ctx: &mut Context, op: ServerOp) -> Result<()> {
    let config = ctx.require_config()?;
    let session = login_if_needed(ctx)?;

    match op {
        ServerOp::Create => {
            select_subdomain_if_needed(ctx, &session, &config.app_key)?;
            let code: String = Input::new()
                .with_prompt("Please enter early access code")
                .interact_text()?;
            server::create_server(&ctx.api, &code).context("Error creating server")?;
            println!("Server created successfully!");
        }
        ServerOp::Delete => {
            server::delete_server(&ctx.api).context("Error deleting server")?;
            println!("Server deleted!");
        }
        ServerOp::Status => {
            let status = server::get_server_status(&ctx.api).context("Error getting server status")?;
            println!("Server status: {}", status.status);
        }
        ServerOp::Start => {
            server::send_server_action(&ctx.api, ServerAction::Start)
                .context("Error starting server")?;
            println!("Server started!");
        }
        ServerOp::Stop => {
            server::send_server_action(&ctx.api, ServerAction::Stop)
                .context("Error stopping server")?;
            println!("Server stopped!");
        }
        ServerOp::Log(lines) => {
            let n = select::log_line_count(lines.as_deref());
            let log = server::get_server_log(&ctx.api, n).context("Error getting server log")?;
            print!("{}", log);
        }
    }
    Ok(())
}
