use std::sync::{Arc, Mutex};
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use shakmaty::Square;
use tracing_subscriber::EnvFilter;

use trainer_client::clients::api::TrainerApi;
use trainer_client::config::Config;
use trainer_client::store::FileStore;
use trainer_client::terminal::{describe_phase, render_board, Prompt};
use trainer_core::animation::{self, MoveAnimationSequencer, PlaybackSpeed};
use trainer_core::drills::{BlunderDifficulty, BlunderRecognition, ColorTrainer, SquareShade};
use trainer_core::puzzle::session::{AttemptOutcome, PuzzleSessionEngine};
use trainer_core::repertoire::session::RepertoireSession;
use trainer_core::repertoire::Side;
use trainer_core::storage::KeyValueStore;

#[derive(Parser)]
#[command(name = "trainer", about = "Chess visualization and opening trainer")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Solve puzzles after watching the last moves play out
    Visualize {
        /// Hidden moves per puzzle
        #[arg(long)]
        ply: Option<u32>,
        #[arg(long, value_enum)]
        speed: Option<SpeedArg>,
    },
    /// Scored ladder of increasingly hard visualization puzzles
    Climb {
        /// Start again from a score of zero
        #[arg(long)]
        reset: bool,
    },
    /// Decide whether the shown move is a blunder
    Blunders {
        #[arg(long, value_enum)]
        difficulty: Option<DifficultyArg>,
    },
    /// Name the colour of highlighted squares
    Colors,
    /// Build an opening repertoire
    Repertoire {
        #[arg(long, value_enum, default_value = "white")]
        side: SideArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SpeedArg {
    Slow,
    Normal,
    Fast,
    Ludicrous,
}

impl From<SpeedArg> for PlaybackSpeed {
    fn from(arg: SpeedArg) -> Self {
        match arg {
            SpeedArg::Slow => PlaybackSpeed::Slow,
            SpeedArg::Normal => PlaybackSpeed::Normal,
            SpeedArg::Fast => PlaybackSpeed::Fast,
            SpeedArg::Ludicrous => PlaybackSpeed::Ludicrous,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DifficultyArg {
    Easy,
    Medium,
    Hard,
}

impl From<DifficultyArg> for BlunderDifficulty {
    fn from(arg: DifficultyArg) -> Self {
        match arg {
            DifficultyArg::Easy => BlunderDifficulty::Easy,
            DifficultyArg::Medium => BlunderDifficulty::Medium,
            DifficultyArg::Hard => BlunderDifficulty::Hard,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SideArg {
    White,
    Black,
}

impl From<SideArg> for Side {
    fn from(arg: SideArg) -> Self {
        match arg {
            SideArg::White => Side::White,
            SideArg::Black => Side::Black,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    tracing::info!(api = %config.api_url, data_dir = %config.data_dir.display(), "Starting trainer");

    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&config.data_dir)?);
    let api = TrainerApi::new(&config)?;
    let mut prompt = Prompt::new();

    match cli.command {
        Command::Visualize { ply, speed } => {
            let mut engine = PuzzleSessionEngine::new(store);
            if let Some(ply) = ply {
                let current = engine.ply() as i32;
                engine.update_ply(ply as i32 - current)?;
            }
            if let Some(speed) = speed {
                engine.set_playback_speed(speed.into());
            }
            run_puzzles(&mut engine, &api, &mut prompt).await
        }
        Command::Climb { reset } => {
            let mut engine = PuzzleSessionEngine::climb(store);
            if reset {
                engine.reset_climb();
            }
            engine.start_playing_climb();
            run_puzzles(&mut engine, &api, &mut prompt).await
        }
        Command::Blunders { difficulty } => {
            let mut drill = BlunderRecognition::open(store);
            if let Some(difficulty) = difficulty {
                drill.set_difficulty(difficulty.into());
            }
            run_blunders(&mut drill, &api, config.blunder_limit, &mut prompt).await
        }
        Command::Colors => {
            let mut trainer = ColorTrainer::open(store);
            run_colors(&mut trainer, &mut prompt).await
        }
        Command::Repertoire { side } => {
            let mut session = RepertoireSession::open(store);
            session.set_active_side(side.into());
            run_repertoire(&mut session, &api, &mut prompt).await
        }
    }
}

async fn fetch_next(engine: &mut PuzzleSessionEngine, api: &TrainerApi) -> anyhow::Result<bool> {
    let options = engine.begin_fetch()?;
    let result = api.fetch_puzzle(&options).await.map_err(Into::into);
    match engine.finish_fetch(result) {
        Ok(()) => Ok(true),
        Err(e) => {
            println!("Problem fetching a puzzle: {e}");
            Ok(false)
        }
    }
}

async fn play_hidden_moves(engine: &mut PuzzleSessionEngine) {
    let sequencer = Mutex::new(MoveAnimationSequencer::new(engine.playback_speed()));
    println!("Watch the next {} move(s):", engine.hidden_moves().len());
    let show_notation = engine.show_notation();
    let sans: Vec<String> = engine.hidden_moves().iter().map(|m| m.san.clone()).collect();
    let mut index = 0;
    animation::play(&sequencer, engine.ghost_moves(), |phase| {
        if let Some(line) = describe_phase(phase) {
            if show_notation && phase.phase == animation::AnimationPhase::Translate {
                println!("{line} ({})", sans.get(index).map(String::as_str).unwrap_or(""));
                index += 1;
            } else {
                println!("{line}");
            }
        }
    })
    .await;
    engine.on_auto_play_end(Instant::now());
}

async fn run_puzzles(
    engine: &mut PuzzleSessionEngine,
    api: &TrainerApi,
    prompt: &mut Prompt,
) -> anyhow::Result<()> {
    'puzzles: loop {
        if !fetch_next(engine, api).await? {
            return Ok(());
        }
        if let Some(climb) = engine.climb_score() {
            println!(
                "Score {} (best {}), step {:?}",
                climb.score(),
                climb.high_score(),
                climb.current_step()
            );
        }
        println!("{}", render_board(engine.current_position(), engine.flipped(), &[]));
        play_hidden_moves(engine).await;
        println!("Find the best move for the side to play after the hidden moves.");

        loop {
            let Some(input) = prompt.ask("move | tap <square> | replay | next | notation | quit").await? else {
                return Ok(());
            };
            match input.as_str() {
                "quit" | "q" => return Ok(()),
                "next" | "n" => continue 'puzzles,
                "replay" => play_hidden_moves(engine).await,
                "notation" => {
                    let on = engine.toggle_notation();
                    println!("Notation {}", if on { "on" } else { "off" });
                }
                tap if tap.starts_with("tap ") => {
                    let Ok(square) = tap[4..].trim().parse::<Square>() else {
                        println!("Not a square: {}", &tap[4..]);
                        continue;
                    };
                    match engine.on_square_press(square, Instant::now()) {
                        Ok(Some(AttemptOutcome::Solved { bonus })) => {
                            println!("{}", render_board(engine.future_position(), engine.flipped(), &[]));
                            match bonus {
                                Some(points) => println!("Solved! +{points}"),
                                None => println!("Solved!"),
                            }
                            continue 'puzzles;
                        }
                        Ok(_) => {
                            let targets = engine.available_targets();
                            println!("{}", render_board(engine.displayed_position(), engine.flipped(), &targets));
                            if let Some(progress) = engine.progress() {
                                println!("{}", progress.message);
                            }
                        }
                        Err(e) => println!("{e}"),
                    }
                }
                mv => match engine.attempt_notation(mv, Instant::now()) {
                    Ok(AttemptOutcome::Solved { bonus }) => {
                        println!("{}", render_board(engine.future_position(), engine.flipped(), &[]));
                        match bonus {
                            Some(points) => println!("Solved! +{points}"),
                            None => println!("Solved!"),
                        }
                        continue 'puzzles;
                    }
                    Ok(_) => {
                        if let Some(progress) = engine.progress() {
                            println!("{}", progress.message);
                        }
                    }
                    Err(e) => println!("{e}"),
                },
            }
        }
    }
}

async fn run_blunders(
    drill: &mut BlunderRecognition,
    api: &TrainerApi,
    limit: u32,
    prompt: &mut Prompt,
) -> anyhow::Result<()> {
    let puzzles = api.fetch_blunder_puzzles(&drill.fetch_options(limit)).await?;
    let mut rng = rand::thread_rng();
    drill.start(puzzles, Instant::now(), &mut rng)?;

    while drill.is_playing() {
        let (Some(position), Some(mv)) = (drill.current_position(), drill.current_move()) else {
            break;
        };
        println!("{}", render_board(position, drill.flipped(), &[]));
        let question = format!(
            "{mv}: blunder? (y/n)  {}s left",
            drill.remaining(Instant::now()).as_secs()
        );
        let Some(answer) = prompt.ask(&question).await? else {
            break;
        };
        let is_blunder = matches!(answer.as_str(), "y" | "yes");
        match drill.guess(is_blunder, Instant::now(), &mut rng)? {
            Some(true) => println!("Correct"),
            Some(false) => println!("Wrong, -5s"),
            None => break,
        }
    }
    drill.stop_round(Instant::now());
    println!(
        "Round over: {} (best {})",
        drill.last_round_score().unwrap_or(0),
        drill.high_score(drill.difficulty())
    );
    for finished in drill.failed() {
        let shown = if finished.showed_blunder {
            &finished.puzzle.blunder
        } else {
            &finished.puzzle.best_move
        };
        println!(
            "  missed {shown} ({} was the blunder, -{}cp)",
            finished.puzzle.blunder, finished.puzzle.centipawns_lost
        );
    }
    Ok(())
}

async fn run_colors(trainer: &mut ColorTrainer, prompt: &mut Prompt) -> anyhow::Result<()> {
    let mut rng = rand::thread_rng();
    trainer.start(Instant::now(), &mut rng);
    while let Some(square) = trainer.current_square() {
        let question = format!("{square}: light or dark? (l/d)");
        let Some(answer) = prompt.ask(&question).await? else {
            break;
        };
        let shade = if answer.starts_with('l') {
            SquareShade::Light
        } else {
            SquareShade::Dark
        };
        match trainer.guess(shade, Instant::now(), &mut rng) {
            Some(true) => println!("Correct"),
            Some(false) => println!("Wrong, -5s"),
            None => break,
        }
    }
    trainer.stop_round();
    println!(
        "Round over: {} (best {})",
        trainer.last_round_score().unwrap_or(0),
        trainer.high_score()
    );
    Ok(())
}

async fn run_repertoire(
    session: &mut RepertoireSession,
    api: &TrainerApi,
    prompt: &mut Prompt,
) -> anyhow::Result<()> {
    loop {
        let flipped = session.active_side() == Side::Black;
        println!("{}", render_board(session.position(), flipped, &[]));
        let Some(input) = prompt
            .ask("move | tap <square> | pgn <line> | undo | add | grade | lines | quit")
            .await?
        else {
            return Ok(());
        };
        let (cmd, rest) = input.split_once(' ').unwrap_or((input.as_str(), ""));
        match cmd {
            "quit" | "q" => return Ok(()),
            "pgn" => {
                if let Err(e) = session.play_pgn(rest) {
                    println!("{e}");
                }
            }
            "undo" => {
                session.undo();
            }
            "tap" => match rest.trim().parse::<Square>() {
                Ok(square) => {
                    if let Err(e) = session.on_square_press(square) {
                        println!("{e}");
                    }
                    let targets: Vec<Square> = session.available_moves().iter().map(|m| m.to).collect();
                    if !targets.is_empty() {
                        println!("{}", render_board(session.position(), flipped, &targets));
                    }
                }
                Err(_) => println!("Not a square: {rest}"),
            },
            "add" => {
                let added = session.add_pending_line();
                println!("Added {added} move(s)");
                if added > 0 {
                    grade(session, api).await;
                }
            }
            "grade" => grade(session, api).await,
            "lines" => {
                for line in session.active_tree().lines() {
                    println!("  {}", trainer_core::repertoire::line_to_pgn(&line));
                }
            }
            _ => {
                if let Err(e) = session.play_move(&input) {
                    println!("{e}");
                }
            }
        }
    }
}

async fn grade(session: &mut RepertoireSession, api: &TrainerApi) {
    let side = session.active_side();
    match api.grade_opening(session.grade_request(side)).await {
        Ok(grade) => {
            println!("Expected depth: {:.1}", grade.expected_depth);
            if let Some(miss) = &grade.biggest_miss {
                println!("Biggest miss ({:.1}%): {}", miss.incidence * 100.0, miss.lines.join(", "));
            }
            session.set_grade(side, grade);
        }
        Err(e) => {
            tracing::warn!(error = %e, "Grading failed");
            println!("Could not grade the repertoire: {e}");
        }
    }
}
