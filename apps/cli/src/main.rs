#![deny(warnings)]

//! Headless CLI for driving the simulation engine and validating invariants.
//!
//! Replays a scripted session — card purchases, clicks, then a passive time
//! jump — against a fresh player state and prints the resulting snapshot.
//! Useful for eyeballing pacing and for exercising the engine end to end
//! without the excluded UI/persistence layers.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use sim_core::{create_initial_state, validate_state, Card};
use sim_engine::{buy_card, click, seconds_to_next_levelup, time_travel_iterative};
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

struct Args {
    start: Option<String>,
    clicks: u32,
    advance_secs: i64,
    cards: Vec<String>,
    json: bool,
}

fn parse_args() -> Args {
    let mut args = Args {
        start: None,
        clicks: 0,
        advance_secs: 0,
        cards: Vec::new(),
        json: false,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--start" => args.start = it.next(),
            "--clicks" => args.clicks = it.next().and_then(|s| s.parse().ok()).unwrap_or(0),
            "--advance" => args.advance_secs = it.next().and_then(|s| s.parse().ok()).unwrap_or(0),
            "--card" => args.cards.extend(it.next()),
            "--json" => args.json = true,
            _ => {}
        }
    }
    args
}

/// Parse a card spec of the form `PRICE:PPS:EPS:PPC`.
fn parse_card(spec: &str, now: DateTime<Utc>) -> Result<Card> {
    let parts: Vec<f64> = spec
        .split(':')
        .map(|p| p.parse::<f64>().with_context(|| format!("bad card spec: {spec}")))
        .collect::<Result<_>>()?;
    let [price, pps, eps, ppc] = parts[..] else {
        bail!("card spec needs 4 fields PRICE:PPS:EPS:PPC, got: {spec}");
    };
    Ok(Card {
        price,
        profit_per_second: pps,
        energy_per_second: eps,
        profit_per_click: ppc,
        own_since: now,
    })
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args();
    let start = match &args.start {
        Some(s) => DateTime::parse_from_rfc3339(s)
            .with_context(|| format!("bad --start instant: {s}"))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };
    info!(
        git_sha = env!("GIT_SHA"),
        %start,
        clicks = args.clicks,
        advance_secs = args.advance_secs,
        "starting session replay"
    );

    let mut state = create_initial_state(start);

    for spec in &args.cards {
        let card = parse_card(spec, start)?;
        let next = buy_card(&state, start, &card);
        if next == state {
            warn!(card = %spec, balance = state.balance, "card purchase rejected");
        }
        state = next;
    }

    for _ in 0..args.clicks {
        state = click(&state, start);
    }

    if args.advance_secs > 0 {
        state = time_travel_iterative(&state, start + Duration::seconds(args.advance_secs));
    }

    validate_state(&state)?;

    println!(
        "Player OK | level: {} | balance: {} | energy: {}/{} | earned: {} | cards: {}",
        state.level,
        state.balance,
        state.energy,
        state.max_energy,
        state.total_earned,
        state.cards.len()
    );
    match seconds_to_next_levelup(&state) {
        Some(secs) => println!("Next level-up in ~{secs}s of passive income"),
        None => println!("No passive income; level up by clicking"),
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    }

    Ok(())
}
