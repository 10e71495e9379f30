use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Parser;
use tracing::info;

use ostinato::model::Chart;
use ostinato::play::Judgement;
use ostinato::replay::{Replay, VirtualReplayPlayer, load_replay};
use ostinato::util::init_logging;

/// Offline replay scoring: plays a recorded (or synthesized) replay against
/// a chart and prints the resulting judgements and score.
#[derive(Parser)]
#[command(name = "ostinato", version, about)]
struct Args {
    /// Chart document (JSON).
    chart: PathBuf,

    /// Replay file (gzip JSON). Omit when using --autoplay.
    replay: Option<PathBuf>,

    /// Synthesize a flawless replay instead of loading one.
    #[arg(long)]
    autoplay: bool,

    /// Print every judgement, not just the summary.
    #[arg(long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(None, args.verbose)?;

    let chart = Chart::load(&args.chart)?;
    info!(
        title = %chart.title,
        key_count = chart.key_count,
        objects = chart.object_count(),
        "chart loaded"
    );

    let replay = if args.autoplay {
        Replay::perfect(&chart)
    } else {
        let Some(path) = &args.replay else {
            bail!("a replay file is required unless --autoplay is set");
        };
        let document = load_replay(path)?;
        let expected = chart.sha256()?;
        if !document.metadata.chart_sha256.is_empty()
            && document.metadata.chart_sha256 != expected
        {
            bail!("replay was recorded against a different chart");
        }
        document.into_replay()?
    };
    info!(frames = replay.len(), "replay ready");

    let mut player = VirtualReplayPlayer::new(&chart, &replay)?;
    player.play_all_frames();

    if args.verbose {
        for stat in player.stats() {
            println!(
                "{:>10.1}ms  {:<9?} object {}{}",
                stat.song_position_ms,
                stat.judgement,
                stat.object_index,
                if stat.release { " (release)" } else { "" }
            );
        }
    }

    let score = player.score();
    println!("score      {:>8}", score.score());
    println!("accuracy   {:>7.2}%", score.accuracy());
    println!("max combo  {:>8}", score.max_combo());
    for tier in [
        Judgement::Marvelous,
        Judgement::Perfect,
        Judgement::Great,
        Judgement::Good,
        Judgement::Okay,
        Judgement::Miss,
    ] {
        println!("{:<10} {:>8}", format!("{tier:?}"), score.count(tier));
    }
    if player.ghost_taps() > 0 {
        println!("ghost taps {:>8}", player.ghost_taps());
    }

    Ok(())
}
