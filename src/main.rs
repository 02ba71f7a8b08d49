use anyhow::{Context, bail};
use clap::Parser;
use route_planner::config::PlannerConfig;
use route_planner::directions::{format_distance, format_duration, format_step_duration};
use route_planner::logging::init_tracing;
use route_planner::session::PlannerSession;
use route_planner::store::Waypoint;
use route_planner::traits::{GeocodingService, RouteEngine};
use tracing::info;

/// Plan a multi-stop route and print turn-by-turn directions.
#[derive(Parser, Debug)]
#[command(name = "route-planner", version, about, long_about = None)]
struct Cli {
    /// Share query to restore, e.g. "loc=52.52,13.40&loc=52.51,13.37"
    query: Option<String>,

    /// Origin address
    #[arg(long)]
    from: Option<String>,

    /// Destination address
    #[arg(long)]
    to: Option<String>,

    /// Intermediate stop, repeatable
    #[arg(long)]
    via: Vec<String>,

    /// OSRM backend [env: OSRM_URL, default: http://localhost:5000]
    #[arg(long)]
    osrm_url: Option<String>,

    /// Nominatim instance [env: NOMINATIM_URL]
    #[arg(long)]
    nominatim_url: Option<String>,

    /// Travel profile understood by the OSRM backend [env: OSRM_PROFILE]
    #[arg(long)]
    profile: Option<String>,

    /// User-Agent sent to Nominatim [env: NOMINATIM_USER_AGENT]
    #[arg(long)]
    user_agent: Option<String>,

    /// Instruction language
    #[arg(long)]
    language: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = PlannerConfig::from_env().context("reading environment")?;
    if let Some(url) = cli.osrm_url {
        config.osrm.base_url = url;
    }
    if let Some(profile) = cli.profile {
        config.osrm.profile = profile;
    }
    if let Some(url) = cli.nominatim_url {
        config.nominatim.base_url = url;
    }
    if let Some(agent) = cli.user_agent {
        config.nominatim.user_agent = agent;
    }
    let config = config.validated()?;

    let session = PlannerSession::from_config(&config).context("building HTTP clients")?;
    let handle = session.start(cli.query.as_deref().unwrap_or_default()).await;
    if let Some(language) = &cli.language {
        handle.set_language(language);
    }

    let addresses: Vec<&String> = cli.from.iter().chain(&cli.via).chain(&cli.to).collect();
    if !addresses.is_empty() {
        if addresses.len() < 2 {
            bail!("--from and --to are both required when planning by address");
        }
        let mut waypoints = Vec::with_capacity(addresses.len());
        for address in addresses {
            let mut hits = handle.geocoder().search(address).await;
            if hits.is_empty() {
                bail!("no match for {address:?}");
            }
            let best = hits.swap_remove(0);
            info!(query = %address, place = %best.display_text, "resolved address");
            waypoints.push(Waypoint::resolved(best.coordinate, best.display_text));
        }
        let store = handle.store();
        for (slot, waypoint) in waypoints.into_iter().enumerate() {
            if slot < store.len() {
                store.update_at(slot, waypoint);
            } else {
                store.append(waypoint);
            }
        }
    }

    handle.pump().await;
    print_report(&handle);
    Ok(())
}

fn print_report<E, G>(handle: &route_planner::session::PlannerHandle<E, G>)
where
    E: RouteEngine + 'static,
    G: GeocodingService + 'static,
{
    println!("?{}", handle.share_query());
    for (index, waypoint) in handle.store().get().iter().enumerate() {
        println!("  {}. {}", index + 1, waypoint.display_text);
    }

    if let Some(notice) = handle.notice() {
        println!("routing failed ({}): {}", notice.kind.as_str(), notice.message);
        return;
    }
    let Some(directions) = handle.directions() else {
        println!("not enough waypoints to route");
        return;
    };

    println!(
        "{} · {}",
        format_distance(directions.summary.total_distance),
        format_duration(directions.summary.total_duration)
    );
    for step in &directions.steps {
        println!(
            "  [{:<12}] {:<60} {:>9} {:>7}",
            step.kind.icon(),
            step.instruction,
            format_distance(step.distance),
            format_step_duration(step.duration)
        );
    }
}
