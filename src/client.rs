//! Headless whiteboard client driven by stdin.
//!
//! Input lines and remote deltas are handled on one thread: a reader thread
//! forwards stdin lines, and the main loop wakes at least once per move
//! interval to release coalesced moves and drain the channel.

use std::io::{self, BufRead};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use inksync_core::{Point, Style, Tool};
use inksync_session::Session;
use inksync_sync::{
    Channel, OfflineChannel, Outcome, PollSummary, SyncConfig, Whiteboard, WsChannel,
    WsChannelConfig,
};
use tracing::{debug, info};

use crate::commands::{self, Input, StyleChange};

pub struct JoinOptions {
    pub ws: Option<WsChannelConfig>,
    pub sync: SyncConfig,
    pub style: Style,
}

pub fn run(options: JoinOptions) -> Result<()> {
    let session = Session::new();
    let channel: Box<dyn Channel> = match &options.ws {
        Some(ws) => {
            info!(url = %ws.url, "connecting");
            Box::new(WsChannel::connect(ws.clone())?)
        }
        None => {
            info!("working offline");
            Box::new(OfflineChannel)
        }
    };

    let interval = options.sync.move_interval;
    let mut board = Whiteboard::new(session, channel, &options.sync);
    board.set_style(options.style);
    println!("client {}", board.client_id());

    let lines = spawn_stdin_reader()?;
    let tick = interval.max(Duration::from_millis(1));

    loop {
        match lines.recv_timeout(tick) {
            Ok(line) => match commands::parse_line(&line) {
                Ok(Some(Input::Quit)) => break,
                Ok(Some(input)) => handle_input(&mut board, input, interval),
                Ok(None) => {}
                Err(e) => println!("error: {e}"),
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                debug!("stdin closed");
                break;
            }
        }

        board.tick(Instant::now());
        let summary = board.poll_remote();
        report_poll(&board, summary);
    }

    board.close();
    let stats = board.engine().stats();
    info!(
        sent = stats.sent,
        skipped = stats.skipped,
        applied = stats.applied,
        malformed = stats.malformed,
        "session finished"
    );
    Ok(())
}

fn spawn_stdin_reader() -> Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("inksync-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("failed to spawn stdin reader")?;
    Ok(rx)
}

fn handle_input(board: &mut Whiteboard<Box<dyn Channel>>, input: Input, interval: Duration) {
    match input {
        Input::Gesture { tool, points } => play_gesture(board, tool, &points, interval),
        Input::Apply(command) => match board.execute(command) {
            Ok(outcome) => report_outcome(board, &outcome),
            Err(e) => println!("error: {e}"),
        },
        Input::SetStyle(change) => {
            let mut style = board.style().clone();
            match change {
                StyleChange::Color(color) => style.color = color,
                StyleChange::LineWidth(width) => style.line_width = width,
                StyleChange::FontFamily(family) => style.font_family = family,
                StyleChange::FontSize(size) => style.font_size = size,
                StyleChange::FontStyle(font_style) => style.font_style = font_style,
            }
            board.set_style(style);
        }
        Input::List => match board.export_json() {
            Ok(json) => {
                println!("{json}");
                println!("{} element(s)", board.collection().len());
            }
            Err(e) => println!("error: {e}"),
        },
        Input::Save(path) => match board.save(&path) {
            Ok(()) => println!("saved {}", path.display()),
            Err(e) => println!("error: {e}"),
        },
        Input::Load(path) => match board.load_file(&path) {
            Ok(outcome) => report_outcome(board, &outcome),
            Err(e) => println!("error: {e}"),
        },
        Input::Help => println!("{}", commands::HELP),
        Input::Quit => {}
    }
}

/// Replay a scripted drag with one move per coalescing window so every
/// point reaches the draft
fn play_gesture(board: &mut Whiteboard<Box<dyn Channel>>, tool: Tool, points: &[Point], interval: Duration) {
    let start = Instant::now();
    let mut outcome = Outcome::Unchanged;
    for (step, command) in Input::gesture_commands(tool, points).into_iter().enumerate() {
        let at = start + interval * step as u32;
        match board.execute_at(command, at) {
            Ok(result) => outcome = result,
            Err(e) => {
                println!("error: {e}");
                return;
            }
        }
    }
    report_outcome(board, &outcome);
}

fn report_outcome(board: &Whiteboard<Box<dyn Channel>>, outcome: &Outcome) {
    match outcome {
        Outcome::Committed { kind, id: Some(id) } => match board.collection().get(id) {
            Some(element) => println!("{kind} {id} {}", element.kind()),
            None => println!("{kind} {id}"),
        },
        Outcome::Committed { kind, id: None } => {
            println!("{kind} {} element(s)", board.collection().len());
        }
        Outcome::Unchanged => println!("no change"),
        Outcome::DraftChanged => {}
    }
}

fn report_poll(board: &Whiteboard<Box<dyn Channel>>, summary: PollSummary) {
    if summary.opened {
        println!("connected");
    }
    if summary.changed() {
        println!("remote {} change(s), {} element(s)", summary.applied, board.collection().len());
    }
    if summary.closed {
        println!("disconnected");
    }
}
