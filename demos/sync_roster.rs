use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use teamsheet::stats::{by_matches_played, member_stats, top_scorers, RANKING_SIZE};
use teamsheet::{
    provider_from_config, DataManager, SheetsClient, SheetsConfig, SyncSnapshot, TeamSummary,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = SheetsConfig::from_env();
    let http = reqwest::Client::new();
    let Some(provider) = provider_from_config(&http, &config) else {
        eprintln!("Set GOOGLE_ACCESS_TOKEN, or GOOGLE_CLIENT_SECRET and GOOGLE_REFRESH_TOKEN");
        std::process::exit(1);
    };

    let layout = config.layout.clone();
    let client = Arc::new(SheetsClient::with_client(http, config, provider));
    let manager = DataManager::new(
        client,
        layout,
        Arc::new(|_: SyncSnapshot| {}),
        Arc::new(|message: String| eprintln!("error: {message}")),
    );

    if !manager.initialize().await {
        std::process::exit(1);
    }
    let Some(snapshot) = manager.perform_initial_sync().await else {
        std::process::exit(1);
    };
    println!(
        "Found {} matches and {} members",
        snapshot.matches.len(),
        snapshot.members.len()
    );

    let summary = TeamSummary::from_matches(&snapshot.matches);
    println!(
        "Record: {}W {}D {}L, win rate {}%",
        summary.record.wins, summary.record.draws, summary.record.losses, summary.win_rate
    );

    let table = member_stats(&snapshot.members, &snapshot.matches);
    println!("{:<20} {:>4} {:>4} {:>4} {:>4} {:>6}", "Name", "Pos", "MP", "G", "A", "Win%");
    for row in by_matches_played(&table) {
        let win_rate = row
            .win_rate()
            .map(|r| format!("{r}%"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<20} {:>4} {:>4} {:>4} {:>4} {:>6}",
            row.name, row.position.to_string(), row.matches, row.goals, row.assists, win_rate
        );
    }

    println!("Top scorers:");
    for (rank, row) in top_scorers(&table, RANKING_SIZE).iter().enumerate() {
        println!("{}. {} ({})", rank + 1, row.name, row.goals);
    }
}
