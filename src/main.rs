//! E-wange Home - command line client
//!
//! Shows the live dashboard, drives actuators, talks to the assistant and
//! runs the admin screens (users, devices, settings, history export).

use anyhow::Context;
use clap::{Parser, Subcommand};
use ewange_home::{
    admin::{
        search_devices, search_users, AdminClient, ControlPermission, DeviceForm, DeviceRegistry,
        DeviceType, NewUser, SettingsStore, SystemSettings,
    },
    assistant::{AssistantClient, ChatSession, NoVoice, QuickCommandMatcher, ReplySource},
    auth::{self, require_admin_session},
    dashboard::{control::DeviceController, DashboardView},
    history::{self, HistoryLogger, TimeRange},
    logging::{init_logging, LogConfig},
    store::{FeedUpdate, HomeStore, MemoryStore, RealtimeDbClient},
    Actuator, DashboardConfig, HomeError, Result, Role, Session,
};
use serde_json::json;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// E-wange Home configuration
#[derive(Parser, Debug)]
#[command(name = "ewange")]
#[command(about = "Monitor and control an E-wange smart home")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true, env = "EWANGE_CONFIG")]
    config: Option<PathBuf>,

    /// Use an in-process demo home instead of the realtime database
    #[arg(long, global = true)]
    offline: bool,

    /// Signed-in user id
    #[arg(long, global = true, env = "EWANGE_USER_ID")]
    user: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the current dashboard
    Status {
        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Follow live updates and log climate history
    Watch {
        /// Do not record temperature/humidity history
        #[arg(long)]
        no_history: bool,
    },
    /// Set an actuator (admin only)
    Set {
        /// lamp, fan, curtains, pump, gate or buzzer
        actuator: String,
        /// Value such as ON, OFF, Open, Closed, Partial
        value: String,
    },
    /// Talk to the assistant; without a message, start an interactive chat
    Chat {
        message: Vec<String>,
    },
    /// Show or export climate history
    History {
        /// 1h, 24h or 7d
        #[arg(long, default_value = "24h")]
        range: String,

        /// Write CSV to this file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write CSV to the default file name for the range
        #[arg(long, conflicts_with = "output")]
        export: bool,
    },
    /// Manage dashboard users (admin only)
    Users {
        #[command(subcommand)]
        action: UsersCommand,
    },
    /// Manage the device registry
    Devices {
        #[command(subcommand)]
        action: DevicesCommand,
    },
    /// Show or change system settings
    Settings {
        #[command(subcommand)]
        action: SettingsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum UsersCommand {
    List {
        /// Filter by name or email
        #[arg(long)]
        search: Option<String>,
    },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "EWANGE_NEW_USER_PASSWORD")]
        password: String,
        #[arg(long, default_value = "viewer")]
        role: String,
    },
    Update {
        user_id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        role: Option<String>,
    },
    Delete {
        user_id: String,
    },
    /// Switch a user between active and disabled
    Toggle {
        user_id: String,
    },
}

#[derive(Subcommand, Debug)]
enum DevicesCommand {
    List {
        #[arg(long)]
        search: Option<String>,
    },
    /// Add a device, or edit it when `--id` names an existing one
    Add {
        #[arg(long)]
        name: String,
        /// Store key the device reads or writes
        #[arg(long)]
        key: String,
        #[arg(long, default_value = "")]
        label: String,
        /// Register a read-only sensor instead of a relay
        #[arg(long)]
        sensor: bool,
        /// Only admins may control the device
        #[arg(long)]
        admin_only: bool,
        #[arg(long)]
        id: Option<String>,
    },
    Delete {
        id: String,
    },
    /// Enable or disable a device
    Toggle {
        id: String,
    },
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    Show,
    Set {
        #[arg(long)]
        temp_threshold: Option<f64>,
        #[arg(long)]
        gas_threshold: Option<String>,
        #[arg(long)]
        parking_capacity: Option<u32>,
        #[arg(long)]
        alert_sound: Option<bool>,
        #[arg(long)]
        manual_override: Option<bool>,
        #[arg(long)]
        theme: Option<String>,
    },
    Reset,
}

impl Cli {
    /// Load the config file and environment, then apply CLI overrides
    fn load_config(&self) -> Result<DashboardConfig> {
        let mut config = DashboardConfig::load(self.config.as_deref())?;
        if let Some(user) = &self.user {
            config.session.user_id = Some(user.clone());
        }
        if self.offline && config.session.user_id.is_none() {
            config.session.user_id = Some(OFFLINE_USER.to_string());
        }
        config.validate()?;
        Ok(config)
    }

    /// Initialize logging based on config and debug flag
    fn initialize_logging(&self, config: &DashboardConfig) -> anyhow::Result<()> {
        let mut log_config = LogConfig::from(&config.logging);
        if self.debug {
            log_config = log_config.debug();
        }
        init_logging(log_config).map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))
    }
}

const OFFLINE_USER: &str = "offline-admin";

/// Demo home used by `--offline`
fn demo_document() -> serde_json::Value {
    json!({
        "main_door": {"access": "Authorized", "door_state": "Closed"},
        "side_door": {"access": "Denied", "door_state": "Closed"},
        "buzzer": "OFF",
        "lamp": "OFF",
        "fan": "OFF",
        "curtains": "Closed",
        "temperature": 24,
        "humidity": 55,
        "gas": "NO",
        "parking_slots": 3,
        "parking_gate": "Closed",
        "water_pump": "OFF",
        "gsm_last_command": "None",
        "users": {
            OFFLINE_USER: {"role": "admin", "email": "admin@ewange.local"}
        }
    })
}

/// Everything a command needs
struct App {
    config: DashboardConfig,
    store: Arc<dyn HomeStore>,
    session: Option<Session>,
}

impl App {
    async fn connect(config: DashboardConfig, offline: bool) -> Result<Self> {
        let store: Arc<dyn HomeStore> = if offline {
            info!("🔌 Offline mode: using the demo home");
            Arc::new(MemoryStore::with_document(demo_document()))
        } else {
            info!("🔗 Connecting to realtime database at {}", config.store.url);
            Arc::new(RealtimeDbClient::new(&config.store)?)
        };

        let session = match &config.session.user_id {
            Some(user_id) => {
                let session = auth::open_session(
                    store.as_ref(),
                    user_id.clone(),
                    config.session.email.clone(),
                    config.session.role_timeout,
                )
                .await;
                info!("👤 Signed in as {} ({})", session.user_id, session.role);
                Some(session)
            }
            None => {
                warn!("No user configured; running without a session");
                None
            }
        };

        Ok(Self {
            config,
            store,
            session,
        })
    }

    fn admin_session(&self) -> Result<&Session> {
        require_admin_session(self.session.as_ref())
    }

    fn session(&self) -> Result<&Session> {
        self.session
            .as_ref()
            .ok_or_else(|| HomeError::authentication("No signed-in session"))
    }

    fn admin_client(&self) -> Result<AdminClient> {
        AdminClient::new(&self.config.admin, self.config.store.timeout)
    }

    fn view(&self, update: &FeedUpdate) -> DashboardView {
        DashboardView::from_snapshot(
            &update.state,
            update.connected,
            self.config.dashboard.parking_capacity,
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config().context("Invalid configuration")?;
    cli.initialize_logging(&config)?;

    info!("🏠 Starting E-wange Home v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(cli, config).await {
        error!(code = e.to_error_code().as_number(), "{e}");
        eprintln!("❌ {}", e.user_message());
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli, config: DashboardConfig) -> Result<()> {
    let app = App::connect(config, cli.offline).await?;

    match cli.command {
        Command::Status { json } => status(&app, json).await,
        Command::Watch { no_history } => watch(&app, !no_history).await,
        Command::Set { actuator, value } => set(&app, &actuator, &value).await,
        Command::Chat { message } => chat(&app, &message.join(" ")).await,
        Command::History {
            range,
            output,
            export,
        } => show_history(&app, &range, output, export).await,
        Command::Users { action } => users(&app, action).await,
        Command::Devices { action } => devices(&app, action).await,
        Command::Settings { action } => settings(&app, action).await,
    }
}

async fn status(app: &App, as_json: bool) -> Result<()> {
    let state = app.store.snapshot().await?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        let update = FeedUpdate {
            state,
            connected: true,
        };
        print!("{}", app.view(&update));
    }
    Ok(())
}

async fn watch(app: &App, record_history: bool) -> Result<()> {
    let mut feed = app.store.subscribe().await?;
    let mut logger = HistoryLogger::new();
    info!("👀 Watching for changes (Ctrl-C to stop)");

    let mut update = feed.current();
    loop {
        print!("{}", app.view(&update));
        println!();

        if record_history && update.connected {
            logger.record(app.store.as_ref(), &update.state).await;
        }

        tokio::select! {
            next = feed.changed() => match next {
                Some(next) => update = next,
                None => {
                    warn!("Live feed closed");
                    return Ok(());
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping");
                return Ok(());
            }
        }
    }
}

async fn set(app: &App, actuator: &str, value: &str) -> Result<()> {
    let actuator: Actuator = actuator.parse()?;
    let controller = DeviceController::new(app.store.clone());
    let action = controller.set(app.session()?, actuator, value).await?;
    println!("✅ {actuator} set to {}", action.value);
    Ok(())
}

async fn chat(app: &App, message: &str) -> Result<()> {
    let timeout = app.config.store.connect_timeout;
    let assistant = match AssistantClient::new(&app.config.assistant, timeout) {
        Ok(client) => Some(client),
        Err(e) => {
            warn!("Assistant unavailable, quick commands only: {e}");
            None
        }
    };

    let mut session = ChatSession::new(
        app.store.clone(),
        assistant,
        QuickCommandMatcher::with_builtin_tables()?,
    );
    if app.config.assistant.voice {
        session = session.with_speaker(Box::new(NoVoice));
    }

    if !message.trim().is_empty() {
        return chat_turn(app, &session, message).await;
    }

    println!("💬 Ask about your home or give a command. Empty line or Ctrl-D to quit.");
    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 || line.trim().is_empty() {
            return Ok(());
        }
        if let Err(e) = chat_turn(app, &session, &line).await {
            eprintln!("❌ {}", e.user_message());
        }
    }
}

async fn chat_turn(app: &App, session: &ChatSession, text: &str) -> Result<()> {
    let home = app.store.snapshot().await?;
    let Some(reply) = session.send(app.session.as_ref(), text, &home).await? else {
        return Ok(());
    };

    let prefix = match reply.source {
        ReplySource::QuickCommand => "⚡",
        ReplySource::Assistant => "🤖",
    };
    println!("{prefix} {}", reply.display_text);
    for action in &reply.failed_actions {
        eprintln!("⚠️  Could not apply {action}");
    }
    Ok(())
}

async fn show_history(
    app: &App,
    range: &str,
    output: Option<PathBuf>,
    export: bool,
) -> Result<()> {
    let range: TimeRange = range.parse()?;
    let rows = history::query(app.store.as_ref(), range).await?;
    let csv = history::to_csv(&rows);

    let target = output.or_else(|| export.then(|| PathBuf::from(range.file_name())));
    match target {
        Some(path) => {
            std::fs::write(&path, csv)?;
            println!("📄 Wrote {} rows to {}", rows.len(), path.display());
        }
        None => {
            println!("History for the last {}:", range.label());
            println!("{csv}");
        }
    }
    Ok(())
}

async fn users(app: &App, action: UsersCommand) -> Result<()> {
    let session = app.admin_session()?;
    let client = app.admin_client()?;

    match action {
        UsersCommand::List { search } => {
            let users = client.list_users(session).await?;
            let shown = search_users(&users, search.as_deref().unwrap_or(""));
            for user in shown {
                println!(
                    "{:<28} {:<24} {:<32} {:<7} {}",
                    user.user_id, user.name, user.email, user.role, user.status
                );
            }
        }
        UsersCommand::Create {
            name,
            email,
            password,
            role,
        } => {
            let user = NewUser {
                name,
                email,
                password,
                role: Role::from_lossy(&role),
            };
            let user_id = client.create_user(session, &user).await?;
            println!("✅ Created user {user_id}");
        }
        UsersCommand::Update {
            user_id,
            name,
            email,
            role,
        } => {
            let mut user = find_user(&client, session, &user_id).await?;
            if let Some(name) = name {
                user.name = name;
            }
            if let Some(email) = email {
                user.email = email;
            }
            if let Some(role) = role {
                user.role = Role::from_lossy(&role);
            }
            client.update_user(session, &user).await?;
            println!("✅ Updated user {user_id}");
        }
        UsersCommand::Delete { user_id } => {
            client.delete_user(session, &user_id).await?;
            println!("🗑️  Deleted user {user_id}");
        }
        UsersCommand::Toggle { user_id } => {
            let user = find_user(&client, session, &user_id).await?;
            let status = client.toggle_status(session, &user).await?;
            println!("✅ {user_id} is now {status}");
        }
    }
    Ok(())
}

async fn find_user(
    client: &AdminClient,
    session: &Session,
    user_id: &str,
) -> Result<ewange_home::admin::DashboardUser> {
    client
        .list_users(session)
        .await?
        .into_iter()
        .find(|user| user.user_id == user_id)
        .ok_or_else(|| HomeError::not_found(format!("No user with id '{user_id}'")))
}

async fn devices(app: &App, action: DevicesCommand) -> Result<()> {
    let registry = DeviceRegistry::new(app.store.clone());

    match action {
        DevicesCommand::List { search } => {
            let devices = registry.list().await?;
            for device in search_devices(&devices, search.as_deref().unwrap_or("")) {
                let enabled = if device.enabled { "enabled" } else { "disabled" };
                println!(
                    "{:<20} {:<20} {:<8} {:<20} {:<8} {}",
                    device.id,
                    device.label,
                    format!("{:?}", device.device_type).to_lowercase(),
                    device.firebase_key,
                    enabled,
                    device.state
                );
            }
        }
        DevicesCommand::Add {
            name,
            key,
            label,
            sensor,
            admin_only,
            id,
        } => {
            let form = DeviceForm {
                name,
                label,
                device_type: if sensor {
                    DeviceType::Sensor
                } else {
                    DeviceType::Relay
                },
                firebase_key: key,
                control_permission: if admin_only {
                    ControlPermission::Admin
                } else {
                    ControlPermission::All
                },
            };
            let existing = match &id {
                Some(id) => Some(find_device(&registry, id).await?),
                None => None,
            };
            let record = registry.save(app.session()?, &form, existing.as_ref()).await?;
            println!("✅ Saved device {}", record.id);
        }
        DevicesCommand::Delete { id } => {
            registry.delete(app.session()?, &id).await?;
            println!("🗑️  Deleted device {id}");
        }
        DevicesCommand::Toggle { id } => {
            let device = find_device(&registry, &id).await?;
            let enabled = registry.toggle_enabled(app.session()?, &device).await?;
            println!("✅ {id} {}", if enabled { "enabled" } else { "disabled" });
        }
    }
    Ok(())
}

async fn find_device(
    registry: &DeviceRegistry,
    id: &str,
) -> Result<ewange_home::admin::DeviceRecord> {
    registry
        .list()
        .await?
        .into_iter()
        .find(|device| device.id == id)
        .ok_or_else(|| HomeError::not_found(format!("No device with id '{id}'")))
}

async fn settings(app: &App, action: SettingsCommand) -> Result<()> {
    let store = SettingsStore::new(app.store.clone());

    let shown = match action {
        SettingsCommand::Show => store.load().await?,
        SettingsCommand::Set {
            temp_threshold,
            gas_threshold,
            parking_capacity,
            alert_sound,
            manual_override,
            theme,
        } => {
            let mut settings = store.load().await?;
            apply_settings(
                &mut settings,
                temp_threshold,
                gas_threshold,
                parking_capacity,
                alert_sound,
                manual_override,
                theme,
            );
            store.save(app.session()?, &settings).await?;
            println!("✅ Settings saved");
            settings
        }
        SettingsCommand::Reset => {
            let settings = store.reset(app.session()?).await?;
            println!("✅ Settings reset to defaults");
            settings
        }
    };

    println!("{}", serde_json::to_string_pretty(&shown)?);
    Ok(())
}

fn apply_settings(
    settings: &mut SystemSettings,
    temp_threshold: Option<f64>,
    gas_threshold: Option<String>,
    parking_capacity: Option<u32>,
    alert_sound: Option<bool>,
    manual_override: Option<bool>,
    theme: Option<String>,
) {
    if let Some(value) = temp_threshold {
        settings.temp_threshold = value;
    }
    if let Some(value) = gas_threshold {
        settings.gas_threshold = value.to_uppercase();
    }
    if let Some(value) = parking_capacity {
        settings.parking_capacity = value;
    }
    if let Some(value) = alert_sound {
        settings.alert_sound = value;
    }
    if let Some(value) = manual_override {
        settings.manual_override = value;
    }
    if let Some(value) = theme {
        settings.theme = value;
    }
}
