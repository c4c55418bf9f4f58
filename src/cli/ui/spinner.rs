//! Progress indicator for Graph calls that can take a while
//!
//! Search requests against large tenants routinely take several seconds.
//! The spinner keeps the console alive meanwhile and shows how long the
//! request has been running. It only animates on an interactive terminal;
//! piped output gets a single status line instead.

use colored::*;
use is_terminal::IsTerminal;
use std::io::{self, Write};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

const FRAMES: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
const FRAME_INTERVAL: Duration = Duration::from_millis(80);

/// Animated status line, removed again when the spinner is dropped
///
/// ```rust,no_run
/// # async fn run() {
/// use graph_search_cli::cli::ui::Spinner;
///
/// let _spinner = Spinner::start("Searching for 'budget'...");
/// // await the Graph call here; the line is cleared when `_spinner` goes out of scope
/// # }
/// ```
pub struct Spinner {
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
    animated: bool,
}

impl Spinner {
    /// Show `message` until the spinner is dropped
    pub fn start(message: impl Into<String>) -> Self {
        let message = message.into();

        if !io::stdout().is_terminal() {
            println!("{}", message);
            return Self {
                stop_tx: None,
                task: None,
                animated: false,
            };
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(animate(message, stop_rx));

        Self {
            stop_tx: Some(stop_tx),
            task: Some(task),
            animated: true,
        }
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        // Drop cannot await the task, so it is aborted and the line cleared here
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if self.animated {
            clear_line();
        }
    }
}

async fn animate(message: String, mut stop_rx: oneshot::Receiver<()>) {
    let started = Instant::now();
    let mut ticker = tokio::time::interval(FRAME_INTERVAL);
    let mut stdout = io::stdout();

    for frame in FRAMES.iter().cycle() {
        let elapsed = format!("{:.1}s", started.elapsed().as_secs_f32());
        print!("\r{} {} {}", frame.to_string().bright_cyan(), message, elapsed.dimmed());
        let _ = stdout.flush();

        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut stop_rx => break,
        }
    }

    clear_line();
}

fn clear_line() {
    print!("\r\x1b[K");
    let _ = io::stdout().flush();
}

/// Await `future` behind a spinner showing `message`
pub async fn with_spinner<F, T>(message: impl Into<String>, future: F) -> T
where
    F: std::future::Future<Output = T>,
{
    let _spinner = Spinner::start(message);
    future.await
}
