//! Progress reporting for turn execution

use colored::Colorize;
use consensus_application::TurnObserver;
use consensus_domain::{ChatTurn, ExpertProfile, TurnStage, WorkerResult, WorkerStatus, truncate};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::io::Write;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const TICK: Duration = Duration::from_millis(100);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Spinner per stage and per expert, drawn on stderr.
///
/// With `stream_answer` the synthesis is printed to stdout as it arrives.
pub struct ProgressReporter {
    multi: MultiProgress,
    stage_bar: Mutex<Option<ProgressBar>>,
    worker_bars: Mutex<Vec<ProgressBar>>,
    stream_answer: bool,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            stage_bar: Mutex::new(None),
            worker_bars: Mutex::new(Vec::new()),
            stream_answer: false,
        }
    }

    pub fn with_streaming(mut self, stream_answer: bool) -> Self {
        self.stream_answer = stream_answer;
        self
    }

    fn stage_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {prefix:.bold.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn worker_style() -> ProgressStyle {
        ProgressStyle::with_template("  {spinner:.yellow} {prefix:<22.bold} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn spinner(&self, style: ProgressStyle, prefix: String) -> ProgressBar {
        let bar = self.multi.add(ProgressBar::new_spinner());
        bar.set_style(style);
        bar.set_prefix(prefix);
        bar.enable_steady_tick(TICK);
        bar
    }

    fn clear_all(&self) {
        if let Some(bar) = lock(&self.stage_bar).take() {
            bar.finish_and_clear();
        }
        for bar in lock(&self.worker_bars).drain(..) {
            if !bar.is_finished() {
                bar.finish_and_clear();
            }
        }
    }

    fn stage_label(stage: TurnStage) -> String {
        let step = match stage {
            TurnStage::Framing => 1,
            TurnStage::Routing => 2,
            TurnStage::Gathering => 3,
            TurnStage::Judging => 4,
            TurnStage::Criticizing => 5,
            TurnStage::Complete | TurnStage::Error => return stage.display_name().to_string(),
        };
        format!("[{}/5] {}", step, stage.display_name())
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnObserver for ProgressReporter {
    fn on_stage_change(&self, turn: &ChatTurn) {
        let stage = turn.stage();
        if stage.is_terminal() {
            self.clear_all();
            return;
        }

        if stage == TurnStage::Judging && self.stream_answer {
            // Bars and streamed text must not interleave
            if let Some(bar) = lock(&self.stage_bar).take() {
                bar.finish_and_clear();
            }
            let _ = self.multi.clear();
            println!("{}", "Consensus:".cyan().bold());
            return;
        }

        let mut stage_bar = lock(&self.stage_bar);
        match stage_bar.as_ref() {
            Some(bar) => bar.set_prefix(Self::stage_label(stage)),
            None => {
                if stage == TurnStage::Criticizing && self.stream_answer {
                    println!();
                }
                *stage_bar = Some(self.spinner(Self::stage_style(), Self::stage_label(stage)));
            }
        }
    }

    fn on_experts_selected(&self, experts: &[ExpertProfile]) {
        if let Some(bar) = lock(&self.stage_bar).as_ref() {
            bar.set_message(format!("{} experts", experts.len()));
        }
        let mut bars = lock(&self.worker_bars);
        for expert in experts {
            let bar = self.spinner(Self::worker_style(), expert.name.clone());
            bar.set_message(expert.role.dimmed().to_string());
            bars.push(bar);
        }
    }

    fn on_worker_update(&self, results: &[WorkerResult]) {
        let bars = lock(&self.worker_bars);
        for (bar, result) in bars.iter().zip(results) {
            if bar.is_finished() {
                continue;
            }
            match result.status {
                WorkerStatus::Pending => {}
                WorkerStatus::Success => {
                    let timing = result
                        .execution_time_ms
                        .map(|ms| format!(" ({:.1}s)", ms as f64 / 1000.0))
                        .unwrap_or_default();
                    bar.finish_with_message(format!("{}{}", "v done".green(), timing.dimmed()));
                }
                WorkerStatus::Error => {
                    let label = if result.requires_configuration {
                        "! needs configuration".yellow()
                    } else {
                        "x failed".red()
                    };
                    bar.finish_with_message(label.to_string());
                }
            }
        }
    }

    fn on_synthesis_chunk(&self, chunk: &str) {
        if self.stream_answer {
            let mut stdout = std::io::stdout().lock();
            let _ = stdout.write_all(chunk.as_bytes());
            let _ = stdout.flush();
        }
    }

    fn on_error(&self, _turn: &ChatTurn, _message: &str) {
        self.clear_all();
    }
}

/// Simple text-based progress (no fancy UI), written to stderr
pub struct SimpleProgress {
    reported: Mutex<Vec<WorkerStatus>>,
}

impl SimpleProgress {
    pub fn new() -> Self {
        Self {
            reported: Mutex::new(Vec::new()),
        }
    }
}

impl Default for SimpleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnObserver for SimpleProgress {
    fn on_stage_change(&self, turn: &ChatTurn) {
        if !turn.is_terminal() {
            eprintln!("{} {}", "->".cyan(), turn.stage().display_name().bold());
        }
    }

    fn on_experts_selected(&self, experts: &[ExpertProfile]) {
        let names: Vec<&str> = experts.iter().map(|e| e.name.as_str()).collect();
        eprintln!("   experts: {}", names.join(", "));
        *lock(&self.reported) = vec![WorkerStatus::Pending; experts.len()];
    }

    fn on_worker_update(&self, results: &[WorkerResult]) {
        let mut reported = lock(&self.reported);
        for (seen, result) in reported.iter_mut().zip(results) {
            if *seen != WorkerStatus::Pending || result.is_pending() {
                continue;
            }
            *seen = result.status;
            if result.is_success() {
                eprintln!("   {} {}", "v".green(), result.expert.name);
            } else {
                eprintln!(
                    "   {} {} ({})",
                    "x".red(),
                    result.expert.name,
                    truncate(&result.content, 80)
                );
            }
        }
    }

    fn on_error(&self, _turn: &ChatTurn, message: &str) {
        eprintln!("{} {}", "x".red(), message);
    }
}
