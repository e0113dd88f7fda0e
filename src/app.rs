use crate::data::AssetReturns;
use crate::frontier::{self, FrontierAnalysis, FrontierConfig};
use crate::portfolio::{self, RiskReturnPoint};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use std::io;

pub enum AppState {
    Input,
    Loading,
    Dashboard,
}

/// Simulation settings fixed at startup from the CLI flags.
pub struct SimulationParams {
    pub count: usize,
    pub range: String,
    pub seed: u64,
    pub frontier: FrontierConfig,
}

pub struct App {
    pub should_quit: bool,
    pub state: AppState,
    pub input: String,
    pub params: SimulationParams,
    pub tickers: Vec<String>,
    pub dataset: Option<Vec<RiskReturnPoint>>,
    pub analysis: Option<FrontierAnalysis>,
    pub error_msg: Option<String>,
}

impl App {
    pub fn new(initial_tickers: &[String], params: SimulationParams) -> Self {
        Self {
            should_quit: false,
            state: AppState::Input,
            input: initial_tickers.join(","),
            params,
            tickers: initial_tickers.to_vec(),
            dataset: None,
            analysis: None,
            error_msg: None,
        }
    }

    pub async fn run(&mut self, terminal: &mut crate::tui::Tui) -> io::Result<()> {
        while !self.should_quit {
            terminal.draw(|f| crate::ui::render(f, self))?;

            if event::poll(std::time::Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        match self.state {
                            AppState::Input => match key.code {
                                KeyCode::Char(c) => self.input.push(c),
                                KeyCode::Backspace => {
                                    self.input.pop();
                                }
                                KeyCode::Enter => {
                                    let tickers: Vec<String> = self
                                        .input
                                        .split(',')
                                        .map(|s| s.trim().to_uppercase())
                                        .filter(|s| !s.is_empty())
                                        .collect();
                                    if tickers.is_empty() {
                                        self.error_msg = Some(
                                            "Enter at least one ticker (comma-separated)".into(),
                                        );
                                    } else {
                                        self.tickers = tickers;
                                        self.state = AppState::Loading;
                                        self.run_simulation().await;
                                    }
                                }
                                KeyCode::Esc => self.should_quit = true,
                                _ => {}
                            },
                            _ => match key.code {
                                KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
                                KeyCode::Char('r') => {
                                    self.state = AppState::Input;
                                    self.dataset = None;
                                    self.analysis = None;
                                    self.error_msg = None;
                                }
                                _ => {}
                            },
                        }
                    }
                }
            }
        }
        Ok(())
    }

    async fn run_simulation(&mut self) {
        match AssetReturns::load(&self.tickers, &self.params.range).await {
            Ok(returns) => {
                match portfolio::simulate_portfolios(
                    self.params.count,
                    returns.tickers(),
                    returns.covariance(),
                    returns.cumulative_returns(),
                    self.params.seed,
                ) {
                    Ok(dataset) => {
                        self.analysis =
                            Some(frontier::extract(&dataset, &self.params.frontier));
                        self.dataset = Some(dataset);
                        self.error_msg = None;
                        self.state = AppState::Dashboard;
                    }
                    Err(e) => {
                        self.error_msg = Some(format!("Simulation failed: {}", e));
                        self.state = AppState::Input;
                    }
                }
            }
            Err(e) => {
                self.error_msg = Some(e.to_string());
                self.state = AppState::Input;
            }
        }
    }
}
