//! `goodtrip` command-line front end.

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use goodtrip_client::types::models::{Profile, Trip};
use goodtrip_client::{ClientConfig, Feed, GoodTripClient, TripDraft};

#[derive(Debug, Parser)]
#[command(name = "goodtrip", about = "Plan trips and follow other travellers", version)]
struct Cli {
    #[arg(long, env = "GOODTRIP_USERNAME")]
    username: String,
    #[arg(long, env = "GOODTRIP_PASSWORD", hide_env_values = true)]
    password: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Your trips and those of everyone you follow, newest first.
    Feed,
    /// Trips of a user (yourself by default).
    Trips { user_id: Option<i64> },
    /// Plan a new trip.
    Plan {
        name: String,
        /// Start date, `dd.mm.yyyy`.
        start: String,
        /// End date, `dd.mm.yyyy`.
        end: String,
        /// Budget in whole US dollars.
        #[arg(long, default_value = "0")]
        budget: String,
        #[arg(long)]
        photo: Option<String>,
        /// A visited country as `Country:City,City`. Repeatable.
        #[arg(long = "country", value_name = "country:cities", value_parser = parse_country)]
        countries: Vec<(String, Vec<String>)>,
        /// A place of interest. Repeatable.
        #[arg(long = "place", value_name = "name")]
        places: Vec<String>,
    },
    /// Followers of a user (yourself by default).
    Followers { user_id: Option<i64> },
    /// Users you follow.
    Following,
    Follow { handle: String },
    Unfollow { handle: String },
}

fn parse_country(value: &str) -> Result<(String, Vec<String>), String> {
    let (country, cities) = value.split_once(':').unwrap_or((value, ""));
    let country = country.trim();
    if country.is_empty() {
        return Err("country name is empty".into());
    }
    let cities = cities
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
        .collect();
    Ok((country.to_string(), cities))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "goodtrip_cli=info,goodtrip_client=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::from_env()?;
    info!("Using backend at {}", config.api_url);

    let client = GoodTripClient::new(config)?;
    let session = client
        .session()
        .login(cli.username.as_str(), cli.password.as_str())
        .await
        .context("login failed")?;

    let result = run(&client, session.user_id, cli.command).await;
    client.session().logout().await;
    result
}

async fn run(client: &GoodTripClient, me: i64, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Feed => {
            let mut feed = Feed::default();
            client.feed().refresh(&mut feed).await?;
            feed.trips().iter().for_each(print_trip);
        }
        Command::Trips { user_id } => {
            let trips = client.trips().user_trips(user_id.unwrap_or(me)).await?;
            trips.iter().for_each(print_trip);
        }
        Command::Plan {
            name,
            start,
            end,
            budget,
            photo,
            countries,
            places,
        } => {
            let mut draft = TripDraft::new(name).dates(start, end).budget(budget);
            if let Some(url) = photo {
                draft = draft.main_photo(url);
            }
            for (country, cities) in countries {
                draft.add_country(country, cities);
            }
            for place in places {
                draft.add_place(place);
            }
            let trip = client.trips().create_trip(&draft).await?;
            info!("Planned trip {}", trip.id);
            print_trip(&trip);
        }
        Command::Followers { user_id } => {
            let profiles = client.social().followers(user_id.unwrap_or(me)).await?;
            profiles.iter().for_each(print_profile);
        }
        Command::Following => {
            let profiles = client.social().subscriptions(me).await?;
            profiles.iter().for_each(print_profile);
        }
        Command::Follow { handle } => {
            client.social().follow(&handle).await?;
            println!("Now following {}", handle);
        }
        Command::Unfollow { handle } => {
            client.social().unfollow(&handle).await?;
            println!("No longer following {}", handle);
        }
    }
    Ok(())
}

// Command output goes to stdout; tracing is for diagnostics only.

fn print_trip(trip: &Trip) {
    println!("{}", trip_line(trip));
}

fn trip_line(trip: &Trip) -> String {
    let countries: Vec<&str> = trip
        .countries
        .iter()
        .map(|v| v.country.name.as_str())
        .collect();
    format!(
        "#{} {} ({} to {}, ${}, {:?}) {}",
        trip.id,
        trip.name,
        trip.start_trip_date,
        trip.end_trip_date,
        trip.money_in_usd,
        trip.state,
        countries.join(", ")
    )
    .trim_end()
    .to_string()
}

fn print_profile(profile: &Profile) {
    println!("@{} {}", profile.handle, profile.display_name());
}
