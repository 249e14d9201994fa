//! Main entry point for the crown-vote command-line client.
//!
//! This file initializes logging and configuration, builds the backend
//! adapter and the device identity, and dispatches one subcommand per user
//! action: browsing, voting, and viewing results.

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use adapters::{Direction, Gender, SupabaseAdapter, VotingService};
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

use crown_vote::{
    auth::AdminAuth,
    config::Config,
    device::{DeviceIdentity, FileStore},
    services::{
        live_results, CandidateDetail, CandidateLookup, Catalog, Neighbor, VoteError, VOTE_THANKS,
    },
    utils::parse_optional_id,
    AppError,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Backend URL, overrides SUPABASE_URL
    #[arg(long)]
    url: Option<String>,

    /// Directory holding the device identifier, overrides CROWN_VOTE_DATA_DIR
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List active universities
    Universities,

    /// List active candidates of a university
    Candidates {
        university: Uuid,

        #[arg(long, default_value = "Male")]
        gender: String,
    },

    /// Show one candidate and the categories open to them
    Candidate { id: Uuid },

    /// Find the previous or next candidate by waist number
    Neighbor {
        id: Uuid,

        #[arg(long, value_enum, default_value_t = Step::Next)]
        direction: Step,
    },

    /// Show this device's remaining tickets for a candidate
    Tickets { candidate: Uuid },

    /// Vote for a candidate in one category (category id, type or label)
    Vote {
        candidate: Uuid,

        #[arg(long)]
        category: String,
    },

    /// Sign in as university admin and show full tallies
    AdminResults {
        university: Option<String>,

        #[arg(long)]
        password: String,
    },

    /// Show the public top result of each category
    LiveResults { university: Option<String> },

    /// Print this installation's device identifier
    DeviceId,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Step {
    Next,
    Prev,
}

impl From<Step> for Direction {
    fn from(step: Step) -> Self {
        match step {
            Step::Next => Direction::Next,
            Step::Prev => Direction::Prev,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), AppError> {
    let mut config = Config::load();
    if let Some(url) = args.url {
        config.supabase_url = Some(url);
    }
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    config.log_presence();

    let store = FileStore::new(config.device_store_path());
    let identity = Arc::new(DeviceIdentity::new(Arc::new(store)));

    // Built per command so `device-id` works without backend settings.
    let connect = || -> Result<Arc<dyn VotingService>, AppError> {
        info!("Connecting to backend...");
        Ok(Arc::new(SupabaseAdapter::new(config.supabase()?)?))
    };

    match args.command {
        Command::Universities => {
            let catalog = Catalog::new(connect()?);
            for university in catalog.universities().await? {
                println!("{}  {}", university.id, university.name);
            }
        }
        Command::Candidates { university, gender } => {
            let catalog = Catalog::new(connect()?);
            let candidates = catalog.candidates(university, &Gender::parse(&gender)).await?;
            if candidates.is_empty() {
                println!("No candidates yet.");
            }
            for candidate in candidates {
                println!(
                    "{:>4}  {}  {}",
                    number(candidate.waist_number),
                    candidate.id,
                    candidate.name
                );
            }
        }
        Command::Candidate { id } => {
            let catalog = Catalog::new(connect()?);
            print_detail(&load_detail(&catalog, id).await?);
        }
        Command::Neighbor { id, direction } => {
            let catalog = Catalog::new(connect()?);
            let detail = load_detail(&catalog, id).await?;
            match catalog.neighbor(&detail.candidate, direction.into()).await {
                Neighbor::Found(neighbor) => println!("{neighbor}"),
                Neighbor::None { message } => println!("{message}"),
            }
        }
        Command::Tickets { candidate } => {
            let catalog = Catalog::new(connect()?);
            let detail = load_detail(&catalog, candidate).await?;
            let mut flow = catalog.voting_flow(detail, identity);
            println!("Tickets left: {}", flow.open().await?);
            for option in flow.category_options() {
                let marker = if option.enabled { "" } else { " (disabled)" };
                println!("  {}  {}{marker}", option.id, option.label);
            }
        }
        Command::Vote {
            candidate,
            category,
        } => {
            let catalog = Catalog::new(connect()?);
            let detail = load_detail(&catalog, candidate).await?;
            let mut flow = catalog.voting_flow(detail, identity);
            println!("Tickets left: {}", flow.open().await?);

            let chosen = flow
                .find_option(&category)
                .ok_or(VoteError::UnknownCategory)?;

            flow.select_category(chosen.id)?;
            flow.submit().await?;
            println!("Vote submitted. {VOTE_THANKS}");
        }
        Command::AdminResults {
            university,
            password,
        } => {
            let auth = AdminAuth::new(connect()?);
            let session = auth
                .sign_in(parse_optional_id(university.as_deref()), &password)
                .await?;
            let results = session.results().await?;

            if let Some(name) = &results.university_name {
                println!("{name}");
            }
            println!(
                "Total votes: {} • {} categories",
                results.total_votes,
                results.groups.len()
            );
            if results.groups.is_empty() {
                println!("No voting results available yet.");
            }
            for group in &results.groups {
                println!("\n{}", group.label);
                for (rank, row) in group.candidates.iter().enumerate() {
                    println!(
                        "  {}. #{} {}  {} votes",
                        rank + 1,
                        number(row.waist_number),
                        row.name,
                        row.votes
                    );
                }
            }
        }
        Command::LiveResults { university } => {
            let service = connect()?;
            let live = live_results(&service, parse_optional_id(university.as_deref())).await?;

            match &live.university {
                Some(university) => println!("University: {}", university.name),
                None => println!("Choose a university to view results"),
            }
            if live.university.is_some() && live.categories.is_empty() {
                println!("No active categories for the selected university.");
            }
            for slot in &live.categories {
                println!("{:<10} {:<16} {}", slot.label, slot.headline(), slot.votes());
            }
        }
        Command::DeviceId => {
            println!("{}", identity.get_device_id().await?);
        }
    }

    Ok(())
}

async fn load_detail(catalog: &Catalog, id: Uuid) -> Result<CandidateDetail, AppError> {
    match catalog.candidate_detail(id).await? {
        CandidateLookup::Found(detail) => Ok(detail),
        CandidateLookup::NotFound => Err(AppError::NotFound("Candidate not found".to_string())),
    }
}

fn number(waist_number: Option<i32>) -> String {
    waist_number.map_or_else(|| "—".to_string(), |n| n.to_string())
}

fn print_detail(detail: &CandidateDetail) {
    let candidate = &detail.candidate;
    let today = Local::now().date_naive();

    println!("#{} {}", number(candidate.waist_number), candidate.name);
    println!(
        "Height:   {}",
        candidate
            .height_cm
            .map_or_else(|| "—".to_string(), |h| format!("{h} cm"))
    );
    println!(
        "Birthday: {}",
        candidate.birthday_display().unwrap_or_else(|| "—".to_string())
    );
    if let Some(age) = candidate.age_on(today) {
        println!("Age:      {age} years");
    }
    println!("Hobby:    {}", candidate.hobby.as_deref().unwrap_or("—"));
    if detail.categories.is_empty() {
        println!("No voting categories available for this candidate.");
    }
}
