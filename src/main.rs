use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indexmap::IndexMap;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cloudplan::config::{ENV_HOST, ENV_LOG, ENV_PASSWORD, ENV_USERNAME};
use cloudplan::{Client, CloudMigrationPlan, CloudOptimizePlan, MigrationOptions, Plan, PlanningApi, PollPolicy};

#[derive(Parser, Debug)]
#[command(name = "cloudplan", version, about = "Cloud migration planning CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Verbose logs
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(flatten)]
    conn: Connection,
    #[command(flatten)]
    poll: PollArgs,
}

#[derive(Args, Debug)]
struct Connection {
    /// Instance host name or URL (falls back to TURBO_HOST)
    #[arg(long, global = true)]
    host: Option<String>,
    /// Falls back to TURBO_USERNAME
    #[arg(long, global = true)]
    username: Option<String>,
    /// Falls back to TURBO_PASSWORD
    #[arg(long, global = true)]
    password: Option<String>,
    /// Accept self-signed certificates
    #[arg(long, global = true)]
    insecure: bool,
}

#[derive(Args, Debug)]
struct PollArgs {
    /// Delay after the first unsuccessful poll, doubled after each further one
    #[arg(long, global = true)]
    poll_base_delay_ms: Option<u64>,
    /// Upper bound on the delay between polls
    #[arg(long, global = true)]
    poll_max_delay_ms: Option<u64>,
    /// Maximum number of plan market polls
    #[arg(long, global = true)]
    poll_max_attempts: Option<u32>,
    /// Give up waiting for the plan market after this many seconds
    #[arg(long, global = true)]
    poll_timeout_secs: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Plan a migration of one VM group onto another placement
    Migrate {
        /// Uuid of the group of VMs to migrate
        #[arg(long)]
        from: String,
        /// Uuid of the destination group
        #[arg(long)]
        to: String,
        #[arg(long)]
        name: String,
        /// Uuid of a group to leave out; defaults to the VMs already on the destination
        #[arg(long)]
        exclude: Option<String>,
        /// Bring your own OS licenses
        #[arg(long)]
        byol: bool,
        #[arg(long)]
        hours_per_month: Option<f64>,
        /// Write the VM template mapping here
        #[arg(long)]
        vm_csv: Option<PathBuf>,
        /// Write the volume tier mapping here
        #[arg(long)]
        volume_csv: Option<PathBuf>,
    },
    /// Plan resize and RI purchases for workloads already in the cloud
    Optimize {
        /// Uuid of the scope group
        #[arg(long)]
        scope: String,
        #[arg(long)]
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var(ENV_LOG).unwrap_or_else(|_| filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let api = connect(&cli.conn).await?;
    let poll = poll_policy(&cli.poll);

    match cli.command {
        Commands::Migrate { from, to, name, exclude, byol, hours_per_month, vm_csv, volume_csv } => {
            let options = MigrationArgs { from, to, name, exclude, byol, hours_per_month, vm_csv, volume_csv };
            cmd_migrate(api, poll, options).await?
        }
        Commands::Optimize { scope, name } => cmd_optimize(api, poll, scope, name).await?,
    }
    Ok(())
}

fn setting(flag: Option<String>, env: &str, what: &str) -> Result<String> {
    flag.or_else(|| std::env::var(env).ok())
        .with_context(|| format!("missing {what}: pass --{what} or set {env}"))
}

async fn connect(conn: &Connection) -> Result<Arc<dyn PlanningApi>> {
    let host = setting(conn.host.clone(), ENV_HOST, "host")?;
    let username = setting(conn.username.clone(), ENV_USERNAME, "username")?;
    let password = setting(conn.password.clone(), ENV_PASSWORD, "password")?;

    let client = Client::new(&host, conn.insecure)?;
    client.login(&username, &password).await?;
    println!("✓ Connected to {}", client.base());
    Ok(Arc::new(client))
}

fn poll_policy(args: &PollArgs) -> PollPolicy {
    let mut poll = PollPolicy::default();
    if let Some(ms) = args.poll_base_delay_ms {
        poll.base_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = args.poll_max_delay_ms {
        poll.max_delay = Duration::from_millis(ms);
    }
    if let Some(n) = args.poll_max_attempts {
        poll.max_attempts = n;
    }
    if let Some(secs) = args.poll_timeout_secs {
        poll.timeout = Duration::from_secs(secs);
    }
    poll
}

async fn run_and_wait(plan: &mut Plan) -> Result<()> {
    plan.run().await?;
    println!("⏳ Waiting for plan market {} ...", plan.market_id()?);
    plan.wait_until(async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await?;
    println!("✓ Plan market {} succeeded", plan.market_id()?);
    Ok(())
}

struct MigrationArgs {
    from: String,
    to: String,
    name: String,
    exclude: Option<String>,
    byol: bool,
    hours_per_month: Option<f64>,
    vm_csv: Option<PathBuf>,
    volume_csv: Option<PathBuf>,
}

async fn cmd_migrate(api: Arc<dyn PlanningApi>, poll: PollPolicy, args: MigrationArgs) -> Result<()> {
    let from = api.get_group_by_uuid(&args.from).await?;
    let to = api.get_group_by_uuid(&args.to).await?;
    let exclude = match &args.exclude {
        Some(uuid) => Some(api.get_group_by_uuid(uuid).await?),
        None => None,
    };
    let options = MigrationOptions { exclude, byol: args.byol, hours_per_month: args.hours_per_month };

    let mut plan = CloudMigrationPlan::new(api, &from, &to, &args.name, options)
        .await?
        .with_poll_policy(poll);
    run_and_wait(plan.plan_mut()).await?;

    if let Some(path) = &args.vm_csv {
        let rows = plan.save_vm_template_mapping_csv(path).await?;
        println!("✓ Wrote {rows} VM rows to {}", path.display());
    }
    if let Some(path) = &args.volume_csv {
        let rows = plan.save_volume_mapping_csv(path).await?;
        println!("✓ Wrote {rows} volume rows to {}", path.display());
    }

    let vms = plan.vms().await?;
    let unplaced: Vec<&str> = vms.unplaced().map(|(id, _)| id).collect();
    println!("VMs: {} placed, {} unplaced", vms.len() - unplaced.len(), unplaced.len());
    for id in unplaced {
        let name = vms
            .get(id)
            .and_then(|e| e.entity())
            .and_then(|e| e.display_name())
            .unwrap_or(id);
        println!("  unplaced: {name}");
    }
    Ok(())
}

async fn cmd_optimize(api: Arc<dyn PlanningApi>, poll: PollPolicy, scope: String, name: String) -> Result<()> {
    let scope = api.get_group_by_uuid(&scope).await?;
    let mut plan = CloudOptimizePlan::new(api, &scope, &name).with_poll_policy(poll);
    run_and_wait(plan.plan_mut()).await?;

    let actions = plan.actions().await?;
    let mut by_type: IndexMap<&str, usize> = IndexMap::new();
    for action in &actions {
        *by_type.entry(action.action_type().unwrap_or("UNKNOWN")).or_default() += 1;
    }
    println!("{} actions", actions.len());
    for (kind, count) in by_type {
        println!("  {kind}: {count}");
    }
    Ok(())
}
