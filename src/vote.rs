//! `gallery vote`: an interactive pairwise voting session on stdin.
//!
//! Each round prints the pair and reads one line: `l` or `r` picks a side,
//! `q` stops. The session ends on its own once no unseen pair is left.

use anyhow::{bail, Result};
use std::io::{BufRead, Write};
use std::sync::Arc;
use tracing::warn;

use photo_gallery_core::models::MediaRecord;
use photo_gallery_core::service::QueryService;
use photo_gallery_core::session::UserSession;
use photo_gallery_core::voting::{community_favorite, VotingSession, VotingState};

use crate::backend::create_service;
use crate::config::{Config, USER_ID_ENV};

enum Choice {
    Left,
    Right,
    Quit,
    Unknown,
}

fn parse_choice(line: &str) -> Choice {
    match line.trim().to_ascii_lowercase().as_str() {
        "l" | "left" => Choice::Left,
        "r" | "right" => Choice::Right,
        "q" | "quit" | "" => Choice::Quit,
        _ => Choice::Unknown,
    }
}

fn describe(media: &MediaRecord) -> String {
    match &media.title {
        Some(title) => format!("#{} {}{} \"{}\"", media.id, media.filename, media.extension, title),
        None => format!("#{} {}{}", media.id, media.filename, media.extension),
    }
}

pub async fn run_vote(config: &Config, user: Option<String>) -> Result<()> {
    let Some(user) = user else {
        bail!("voting needs a user: pass --user or set {}", USER_ID_ENV);
    };
    let service = create_service(config).await?;
    let identity = Arc::new(UserSession::new(Some(user)));
    let mut session = VotingSession::new(Arc::clone(&service), identity);
    session.sync_identity().await?;

    let interactive = atty::is(atty::Stream::Stdin);
    let stdin = std::io::stdin();
    let mut cast = 0usize;

    loop {
        let (left, right) = match session.state() {
            VotingState::HasPair(pair) => (pair.left.id, pair.right.id),
            VotingState::Exhausted => {
                println!("No unseen pairs left.");
                break;
            }
            VotingState::Loading => {
                session.refresh().await?;
                continue;
            }
            VotingState::Uninitialized => break,
        };
        if let Some(pair) = session.pair() {
            println!("[l] {}  vs  [r] {}", describe(&pair.left), describe(&pair.right));
        }
        if interactive {
            print!("> ");
            std::io::stdout().flush()?;
        }

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let selected = match parse_choice(&line) {
            Choice::Left => left,
            Choice::Right => right,
            Choice::Quit => break,
            Choice::Unknown => {
                eprintln!("Type l, r or q.");
                continue;
            }
        };

        match session.vote(selected).await {
            Ok(_) => {
                cast += 1;
                println!("Voted for #{}.", selected);
            }
            Err(err) => {
                // Pair is unchanged (or will be refreshed); let the user retry.
                warn!(error = %err, "vote failed");
                eprintln!("Vote failed: {}", err);
            }
        }
    }

    println!("{} vote(s) this session, {} in total.", cast, session.history().len());
    if let Some(favorite) = session.favorite_media_id() {
        println!("Your favorite: #{}", favorite);
    }
    print_community_favorite(service.as_ref()).await;
    Ok(())
}

async fn print_community_favorite(service: &dyn QueryService) {
    match community_favorite(service).await {
        Ok(Some(media)) => println!("Community favorite: {}", describe(&media)),
        Ok(None) => {}
        Err(err) => warn!(error = %err, "could not load community favorite"),
    }
}
