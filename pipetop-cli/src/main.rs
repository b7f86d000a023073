// Suppress clippy warnings that require extensive refactoring
#![allow(clippy::collapsible_if)]
#![allow(clippy::manual_clamp)]
#![allow(clippy::too_many_arguments)]

mod client;
mod commands;
mod fake;
mod sync;
mod ui;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use crossterm::{
    event::{self, Event as CEvent, KeyCode, KeyEvent},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};

use tokio::sync::{RwLock, broadcast, mpsc};

use pipetop_core::api::CrmApi;
use pipetop_core::config::{Config, ConfigError};
use pipetop_core::model::*;
use pipetop_core::reducer::*;
use pipetop_core::state::*;

use client::HttpApi;
use fake::FakeApi;
use sync::{SyncCommand, SyncWorker};
use ui::styles;

#[derive(Parser)]
#[command(name = "pipetop")]
#[command(about = "Terminal dashboard for a sales CRM backend", long_about = None)]
struct Cli {
    /// Backend base URL, overriding config and environment
    #[arg(long, global = true)]
    backend: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Init {
        #[arg(short, long)]
        yes: bool,
    },
    Doctor,
    Tui {
        /// Serve seeded in-memory records instead of talking to a backend
        #[arg(long)]
        demo: bool,
    },
    Summary,
    Leads,
    Deals,
    Tasks,
    AddLead {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        email: String,
    },
    AddDeal {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        value: String,
    },
    AddTask {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "follow-up")]
        kind: String,
    },
    Qualify {
        id: String,
    },
    Lose {
        id: String,
    },
}

fn try_load_config() -> Option<(PathBuf, Config)> {
    let cwd = std::env::current_dir().ok()?;
    match Config::discover(&cwd) {
        Ok(found) => Some(found),
        Err(ConfigError::NotFound { .. }) => None,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            None
        }
    }
}

/// Deal values arrive as free text from flags and form fields; anything
/// that does not parse counts as 0 instead of failing the write
fn parse_or_zero(input: &str) -> f64 {
    input.trim().parse().unwrap_or(0.0)
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = Cli::parse();

    let config = try_load_config();
    let base_url = match cli.backend.as_deref() {
        Some(url) => url.trim_end_matches('/').to_string(),
        None => match &config {
            Some((_, config)) => config.effective_base_url(),
            None => Config::default().effective_base_url(),
        },
    };

    // Handle subcommands
    let demo = match cli.command {
        Some(Commands::Init { yes }) => match commands::run_init(yes) {
            Ok(()) => return Ok(()),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        Some(Commands::Doctor) => match commands::run_doctor(cli.backend).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        Some(Commands::Summary) => {
            return run_cli_list(&base_url, Resource::Dashboard).await;
        }
        Some(Commands::Leads) => {
            return run_cli_list(&base_url, Resource::Leads).await;
        }
        Some(Commands::Deals) => {
            return run_cli_list(&base_url, Resource::Deals).await;
        }
        Some(Commands::Tasks) => {
            return run_cli_list(&base_url, Resource::Tasks).await;
        }
        Some(Commands::AddLead { name, email }) => {
            return run_cli_write(&base_url, CliWrite::Lead(NewLead { name, email })).await;
        }
        Some(Commands::AddDeal { title, value }) => {
            let deal = NewDeal {
                title,
                value: parse_or_zero(&value),
            };
            return run_cli_write(&base_url, CliWrite::Deal(deal)).await;
        }
        Some(Commands::AddTask { title, kind }) => {
            let task = NewTask {
                title,
                kind: TaskKind::parse(&kind).unwrap_or_default(),
            };
            return run_cli_write(&base_url, CliWrite::Task(task)).await;
        }
        Some(Commands::Qualify { id }) => {
            return run_cli_write(
                &base_url,
                CliWrite::Status {
                    id,
                    status: LeadStatus::Qualified,
                },
            )
            .await;
        }
        Some(Commands::Lose { id }) => {
            return run_cli_write(
                &base_url,
                CliWrite::Status {
                    id,
                    status: LeadStatus::Lost,
                },
            )
            .await;
        }
        Some(Commands::Tui { demo }) => demo,
        None => false,
    };

    // Run TUI
    let project_name = match &config {
        Some((path, config)) => {
            eprintln!("Loaded config from: {}", path.display());
            config.name.clone().unwrap_or_else(|| "pipetop".to_string())
        }
        None => "pipetop".to_string(),
    };

    run_tui(&base_url, demo, &project_name).await
}

/// One-shot writes issued from the shell
enum CliWrite {
    Lead(NewLead),
    Deal(NewDeal),
    Task(NewTask),
    Status { id: String, status: LeadStatus },
}

/// Apply one write against the backend, then list the owning collection
/// so the caller sees the post-write rows
async fn run_cli_write(base_url: &str, write: CliWrite) -> io::Result<()> {
    let api = HttpApi::new(base_url);
    let (action, owner, result) = match write {
        CliWrite::Lead(lead) => (
            MutationAction::AddLead,
            Resource::Leads,
            api.create_lead(lead).await,
        ),
        CliWrite::Deal(deal) => (
            MutationAction::AddDeal,
            Resource::Deals,
            api.create_deal(deal).await,
        ),
        CliWrite::Task(task) => (
            MutationAction::AddTask,
            Resource::Tasks,
            api.create_task(task).await,
        ),
        CliWrite::Status { id, status } => (
            MutationAction::SetLeadStatus,
            Resource::Leads,
            api.patch_lead_status(&id, status).await,
        ),
    };

    match result {
        Ok(()) => {
            println!("{}", action.done_label());
            run_cli_list(base_url, owner).await
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run_cli_list(base_url: &str, resource: Resource) -> io::Result<()> {
    let api = HttpApi::new(base_url);
    let outcome = match resource {
        Resource::Leads => api.list_leads().await.map(|rows| print_leads(&rows)),
        Resource::Deals => api.list_deals().await.map(|rows| print_deals(&rows)),
        Resource::Tasks => api.list_tasks().await.map(|rows| print_tasks(&rows)),
        Resource::Dashboard => api.fetch_summary().await.map(|s| print_summary(&s)),
    };
    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn print_leads(rows: &[Lead]) {
    if rows.is_empty() {
        println!("{}", BodySection::Leads.empty_text());
        return;
    }
    println!("{:<24} {:<28} {:<10} ID", "NAME", "EMAIL", "STATUS");
    for lead in rows {
        println!(
            "{:<24} {:<28} {:<10} {}",
            lead.name,
            lead.email.as_deref().unwrap_or("-"),
            lead.status.label(),
            lead.id
        );
    }
}

fn print_deals(rows: &[Deal]) {
    if rows.is_empty() {
        println!("{}", BodySection::Deals.empty_text());
        return;
    }
    println!("{:<32} {:<16} {:>12} ID", "TITLE", "STAGE", "VALUE");
    for deal in rows {
        println!(
            "{:<32} {:<16} {:>12} {}",
            deal.title,
            deal.stage,
            format!("${}", deal.value),
            deal.id
        );
    }
}

fn print_tasks(rows: &[Task]) {
    if rows.is_empty() {
        println!("{}", BodySection::Tasks.empty_text());
        return;
    }
    println!("{:<10} {:<36} {:<6} ID", "TYPE", "TITLE", "DONE");
    for task in rows {
        println!(
            "{:<10} {:<36} {:<6} {}",
            task.kind.label(),
            task.title,
            if task.completed { "yes" } else { "no" },
            task.id
        );
    }
}

fn print_summary(summary: &DashboardSummary) {
    let cards = summary.cards;
    println!("Total Leads : {}", cards.total_leads);
    println!("Deals       : {}", cards.total_deals);
    println!("Revenue     : {}$", cards.revenue);
    println!("Conversion  : {}%", cards.conversion_rate);

    println!();
    println!("Pipeline by Stage");
    if summary.pipeline.is_empty() {
        println!("  {}", BodySection::Pipeline.empty_text());
    } else {
        for stage in &summary.pipeline {
            println!("  {:<20} {}", stage.stage, stage.count);
        }
    }

    println!();
    println!("Recent activity");
    if summary.recent_activities.is_empty() {
        println!("  {}", BodySection::RecentActivity.empty_text());
    } else {
        for activity in &summary.recent_activities {
            println!(
                "  {:<36} {:<10} {}",
                activity.subject, activity.kind, activity.created_at
            );
        }
    }
}

async fn run_tui(base_url: &str, demo: bool, project_name: &str) -> io::Result<()> {
    // Event channel between the sync worker and the reducer
    let (event_tx, _) = broadcast::channel::<EventEnvelope>(1_000);
    let (command_tx, command_rx) = mpsc::channel::<SyncCommand>(100);

    let api: Arc<dyn CrmApi> = if demo {
        eprintln!("Demo mode: serving seeded records from memory");
        Arc::new(FakeApi::default())
    } else {
        Arc::new(HttpApi::new(base_url))
    };
    let backend_label = if demo {
        format!("{} backend", api.name())
    } else {
        base_url.to_string()
    };

    // Spawn the sync worker
    let worker = SyncWorker::new(api, event_tx.clone());
    tokio::spawn(async move {
        worker.run(command_rx).await;
    });

    let state = Arc::new(RwLock::new(AppState::new()));

    // Reducer task
    let state_for_reducer = state.clone();
    let mut reducer_rx = event_tx.subscribe();
    tokio::spawn(async move {
        while let Ok(env) = reducer_rx.recv().await {
            let mut s = state_for_reducer.write().await;
            reduce(&mut s, &env);
        }
    });

    // First paint starts from the dashboard
    let _ = command_tx.send(SyncCommand::Load(Resource::Dashboard)).await;

    let mut terminal = setup_terminal()?;
    let res = tui_loop(&mut terminal, state, command_tx, project_name, &backend_label).await;
    restore_terminal(terminal)?;
    res
}

// --- Terminal setup/teardown ---
fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Inputs of the add-record overlay. One instance persists across opens,
/// so the task kind picked last time sticks for the next entry.
#[derive(Clone, Debug, Default)]
struct AddForm {
    /// Focused text input (0 or 1; the task form only has one)
    field: usize,
    name: String,
    email: String,
    title: String,
    value: String,
    kind: TaskKind,
}

#[derive(Clone, Debug, Default)]
struct UiState {
    selected: usize,
    form_open: bool,
    form: AddForm,
    help_open: bool,
}

/// The form input that currently has focus on this screen
fn form_input_mut(form: &mut AddForm, screen: Screen) -> &mut String {
    match (screen, form.field) {
        (Screen::Leads, 0) => &mut form.name,
        (Screen::Leads, _) => &mut form.email,
        (Screen::Deals, 1) => &mut form.value,
        _ => &mut form.title,
    }
}

fn visible_rows(state: &AppState) -> usize {
    match state.screen {
        Screen::Leads => state.leads.len(),
        Screen::Deals => state.deals.len(),
        Screen::Tasks => state.tasks.len(),
        Screen::Dashboard => 0,
    }
}

fn selected_lead_id(state: &AppState, selected: usize) -> Option<String> {
    state.leads.rows.get(selected).map(|lead| lead.id.clone())
}

fn phase_label(phase: &LoadPhase) -> &'static str {
    match phase {
        LoadPhase::Idle => "idle",
        LoadPhase::Loading => "loading",
        LoadPhase::Loaded => "loaded",
        LoadPhase::LoadFailed { .. } => "failed",
    }
}

/// Body sections that render a placeholder when they have no rows.
/// Each section's wording is distinct, so a blank screen still says
/// what it would be showing. Shared by the CLI tables and the TUI.
#[derive(Clone, Copy, Debug)]
enum BodySection {
    Leads,
    Deals,
    Tasks,
    Pipeline,
    RecentActivity,
}

impl BodySection {
    fn empty_text(self) -> &'static str {
        match self {
            BodySection::Leads => "No leads yet",
            BodySection::Deals => "No deals yet",
            BodySection::Tasks => "No tasks yet",
            BodySection::Pipeline => "No data yet",
            BodySection::RecentActivity => "No recent activity",
        }
    }
}

/// Placeholder row for an empty collection, phrased by load phase
fn empty_item(phase: &LoadPhase, idle_text: &'static str) -> ListItem<'static> {
    let line = match phase {
        LoadPhase::Loading => Line::from(Span::styled("Loading…", styles::warn())),
        LoadPhase::LoadFailed { error } => Line::from(vec![
            Span::styled(format!("Load failed: {}", error), styles::error()),
            Span::styled("  (r to retry)", styles::text_muted()),
        ]),
        _ => Line::from(Span::styled(idle_text, styles::text_muted())),
    };
    ListItem::new(line)
}

async fn tui_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: Arc<RwLock<AppState>>,
    command_tx: mpsc::Sender<SyncCommand>,
    project_name: &str,
    backend_label: &str,
) -> io::Result<()> {
    let mut ui = UiState::default();
    let mut list_state = ListState::default();

    loop {
        let snapshot = state.read().await;

        let screen = snapshot.screen;
        let row_count = visible_rows(&snapshot);
        if row_count == 0 {
            ui.selected = 0;
            list_state.select(None);
        } else {
            if ui.selected >= row_count {
                ui.selected = row_count - 1;
            }
            list_state.select(Some(ui.selected));
        }

        terminal.draw(|f| {
            let area = f.area();

            // Layout:
            // [ top bar ]
            // [ body ]
            // [ footer ]
            let outer = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(1), // Top bar
                    Constraint::Min(1),    // Body
                    Constraint::Length(1), // Footer
                ])
                .split(area);

            // ---------------- Top Bar ----------------
            let phase = snapshot.phase(screen.resource());
            let mut top_spans = vec![
                Span::styled(" Pipetop ", styles::accent_bold()),
                Span::styled(project_name, styles::text()),
                Span::raw("  "),
            ];
            for s in Screen::ALL {
                top_spans.push(Span::styled(
                    format!(" {}:{} ", s.key(), s.label()),
                    styles::tab(s == screen),
                ));
            }
            top_spans.push(Span::raw("  "));
            top_spans.push(Span::styled(
                format!("{} {}", styles::phase_icon(phase), phase_label(phase)),
                styles::phase(phase),
            ));
            top_spans.push(Span::raw("  "));
            top_spans.push(Span::styled(backend_label, styles::text_muted()));
            f.render_widget(Paragraph::new(Line::from(top_spans)), outer[0]);

            // ---------------- Body ----------------
            match screen {
                Screen::Dashboard => {
                    let body = Layout::default()
                        .direction(Direction::Vertical)
                        .constraints([
                            Constraint::Length(5), // Stat cards
                            Constraint::Min(1),    // Pipeline + activity
                        ])
                        .split(outer[1]);

                    let cards_row = Layout::default()
                        .direction(Direction::Horizontal)
                        .constraints([
                            Constraint::Percentage(25),
                            Constraint::Percentage(25),
                            Constraint::Percentage(25),
                            Constraint::Percentage(25),
                        ])
                        .split(body[0]);

                    let cards = snapshot.dashboard.cards();
                    let stat_cards = [
                        ("Total Leads", cards.total_leads.to_string()),
                        ("Deals", cards.total_deals.to_string()),
                        ("Revenue", format!("{}$", cards.revenue)),
                        ("Conversion", format!("{}%", cards.conversion_rate)),
                    ];
                    for (i, (title, value)) in stat_cards.iter().enumerate() {
                        let block = Block::default()
                            .title(*title)
                            .borders(Borders::ALL)
                            .border_style(styles::border_subtle());
                        let text = Paragraph::new(Line::from(Span::styled(
                            value.as_str(),
                            styles::stat_value(),
                        )))
                        .block(block);
                        f.render_widget(text, cards_row[i]);
                    }

                    let panels = Layout::default()
                        .direction(Direction::Horizontal)
                        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                        .split(body[1]);

                    // Pipeline by Stage
                    let pipeline = snapshot.dashboard.pipeline();
                    let pipeline_lines: Vec<Line> = if pipeline.is_empty() {
                        let line = match phase {
                            LoadPhase::Loading => Span::styled("Loading…", styles::warn()),
                            LoadPhase::LoadFailed { error } => {
                                Span::styled(format!("Load failed: {}", error), styles::error())
                            }
                            _ => Span::styled(
                                BodySection::Pipeline.empty_text(),
                                styles::text_muted(),
                            ),
                        };
                        vec![Line::from(line)]
                    } else {
                        pipeline
                            .iter()
                            .map(|stage| {
                                Line::from(vec![
                                    Span::styled(format!("{:<20}", stage.stage), styles::text()),
                                    Span::styled(stage.count.to_string(), styles::stat_value()),
                                ])
                            })
                            .collect()
                    };
                    let block = Block::default()
                        .title("Pipeline by Stage")
                        .borders(Borders::ALL)
                        .border_style(styles::border_subtle());
                    f.render_widget(Paragraph::new(pipeline_lines).block(block), panels[0]);

                    // Recent activity
                    let activities = snapshot.dashboard.recent_activities();
                    let activity_lines: Vec<Line> = if activities.is_empty() {
                        vec![Line::from(Span::styled(
                            BodySection::RecentActivity.empty_text(),
                            styles::text_muted(),
                        ))]
                    } else {
                        activities
                            .iter()
                            .map(|activity| {
                                Line::from(vec![
                                    Span::styled(activity.subject.as_str(), styles::text()),
                                    Span::raw("  "),
                                    Span::styled(activity.kind.as_str(), styles::text_dim()),
                                    Span::raw("  "),
                                    Span::styled(
                                        activity.created_at.as_str(),
                                        styles::text_muted(),
                                    ),
                                ])
                            })
                            .collect()
                    };
                    let block = Block::default()
                        .title("Recent activity")
                        .borders(Borders::ALL)
                        .border_style(styles::border_subtle());
                    f.render_widget(Paragraph::new(activity_lines).block(block), panels[1]);
                }
                Screen::Leads => {
                    let leads = &snapshot.leads;
                    let items: Vec<ListItem> = if leads.is_empty() {
                        vec![empty_item(&leads.phase, BodySection::Leads.empty_text())]
                    } else {
                        leads
                            .rows
                            .iter()
                            .map(|lead| {
                                ListItem::new(Line::from(vec![
                                    Span::styled(format!("{:<24}", lead.name), styles::text()),
                                    Span::styled(
                                        format!("{:<28}", lead.email.as_deref().unwrap_or("-")),
                                        styles::text_dim(),
                                    ),
                                    Span::styled(
                                        format!("{:<10}", lead.status.label()),
                                        styles::lead_status(&lead.status),
                                    ),
                                    Span::styled(lead.id.as_str(), styles::text_muted()),
                                ]))
                            })
                            .collect()
                    };
                    let block = Block::default()
                        .title(format!(" Leads ({}) ", leads.len()))
                        .borders(Borders::ALL)
                        .border_style(styles::border_focused());
                    let list = List::new(items)
                        .block(block)
                        .highlight_style(styles::selection())
                        .highlight_symbol("▶ ");
                    f.render_stateful_widget(list, outer[1], &mut list_state);
                }
                Screen::Deals => {
                    let deals = &snapshot.deals;
                    let items: Vec<ListItem> = if deals.is_empty() {
                        vec![empty_item(&deals.phase, BodySection::Deals.empty_text())]
                    } else {
                        deals
                            .rows
                            .iter()
                            .map(|deal| {
                                ListItem::new(Line::from(vec![
                                    Span::styled(format!("{:<32}", deal.title), styles::text()),
                                    Span::styled(format!("{:<16}", deal.stage), styles::accent()),
                                    Span::styled(
                                        format!("{:>10}", format!("${}", deal.value)),
                                        styles::stat_value(),
                                    ),
                                    Span::raw("  "),
                                    Span::styled(deal.id.as_str(), styles::text_muted()),
                                ]))
                            })
                            .collect()
                    };
                    let block = Block::default()
                        .title(format!(" Deals ({}) ", deals.len()))
                        .borders(Borders::ALL)
                        .border_style(styles::border_focused());
                    let list = List::new(items)
                        .block(block)
                        .highlight_style(styles::selection())
                        .highlight_symbol("▶ ");
                    f.render_stateful_widget(list, outer[1], &mut list_state);
                }
                Screen::Tasks => {
                    let tasks = &snapshot.tasks;
                    let items: Vec<ListItem> = if tasks.is_empty() {
                        vec![empty_item(&tasks.phase, BodySection::Tasks.empty_text())]
                    } else {
                        tasks
                            .rows
                            .iter()
                            .map(|task| {
                                let check_style = if task.completed {
                                    styles::success()
                                } else {
                                    styles::text_muted()
                                };
                                ListItem::new(Line::from(vec![
                                    Span::styled(
                                        if task.completed { "[x] " } else { "[ ] " },
                                        check_style,
                                    ),
                                    Span::styled(
                                        format!("{:<10}", task.kind.label()),
                                        styles::task_kind(&task.kind),
                                    ),
                                    Span::styled(format!("{:<36}", task.title), styles::text()),
                                    Span::styled(task.id.as_str(), styles::text_muted()),
                                ]))
                            })
                            .collect()
                    };
                    let block = Block::default()
                        .title(format!(" Tasks ({}) ", tasks.len()))
                        .borders(Borders::ALL)
                        .border_style(styles::border_focused());
                    let list = List::new(items)
                        .block(block)
                        .highlight_style(styles::selection())
                        .highlight_symbol("▶ ");
                    f.render_stateful_widget(list, outer[1], &mut list_state);
                }
            }

            // ---------------- Footer ----------------
            let mut footer_spans: Vec<Span> = Vec::new();
            if screen != Screen::Dashboard {
                footer_spans.push(Span::styled("a", styles::key_hint()));
                footer_spans.push(Span::styled(" add  ", styles::text_dim()));
            }
            footer_spans.push(Span::styled("r", styles::key_hint()));
            footer_spans.push(Span::styled(" reload  ", styles::text_dim()));
            if screen == Screen::Leads {
                footer_spans.push(Span::styled("q", styles::key_hint()));
                footer_spans.push(Span::styled(" qualify  ", styles::text_dim()));
                footer_spans.push(Span::styled("x", styles::key_hint()));
                footer_spans.push(Span::styled(" lose  ", styles::text_dim()));
            }
            footer_spans.push(Span::styled("?", styles::key_hint()));
            footer_spans.push(Span::styled(" help  ", styles::text_dim()));
            if screen == Screen::Leads {
                footer_spans.push(Span::styled("Esc", styles::key_hint()));
            } else {
                footer_spans.push(Span::styled("q", styles::key_hint()));
            }
            footer_spans.push(Span::styled(" quit", styles::text_dim()));
            if let Some(notice) = &snapshot.notice {
                footer_spans.push(Span::raw("   "));
                footer_spans.push(Span::styled(
                    notice.text.as_str(),
                    if notice.ok {
                        styles::success()
                    } else {
                        styles::error()
                    },
                ));
            }
            f.render_widget(Paragraph::new(Line::from(footer_spans)), outer[2]);

            // ---------------- Add Form Modal ----------------
            if ui.form_open {
                let modal_width = (area.width * 60 / 100).min(54).max(30);
                let modal_height = 7u16.min(area.height.saturating_sub(2));
                let modal_x = (area.width.saturating_sub(modal_width)) / 2;
                let modal_y = (area.height.saturating_sub(modal_height)) / 2;

                let modal_rect = Rect {
                    x: modal_x,
                    y: modal_y,
                    width: modal_width,
                    height: modal_height,
                };

                f.render_widget(Clear, modal_rect);

                let title = match screen {
                    Screen::Leads => " New lead ",
                    Screen::Deals => " New deal ",
                    Screen::Tasks => " New task ",
                    Screen::Dashboard => " New record ",
                };
                let block = Block::default()
                    .borders(Borders::ALL)
                    .border_style(styles::border_focused())
                    .title(title);
                let inner = block.inner(modal_rect);
                f.render_widget(block, modal_rect);

                let label_style = |field: usize| {
                    if ui.form.field == field {
                        styles::accent()
                    } else {
                        styles::text_dim()
                    }
                };

                let mut form_lines: Vec<Line> = Vec::new();
                match screen {
                    Screen::Leads => {
                        form_lines.push(Line::from(vec![
                            Span::styled("Name:  ", label_style(0)),
                            Span::styled(ui.form.name.as_str(), styles::text()),
                        ]));
                        form_lines.push(Line::from(vec![
                            Span::styled("Email: ", label_style(1)),
                            Span::styled(ui.form.email.as_str(), styles::text()),
                        ]));
                    }
                    Screen::Deals => {
                        form_lines.push(Line::from(vec![
                            Span::styled("Title: ", label_style(0)),
                            Span::styled(ui.form.title.as_str(), styles::text()),
                        ]));
                        form_lines.push(Line::from(vec![
                            Span::styled("Value: ", label_style(1)),
                            Span::styled(ui.form.value.as_str(), styles::text()),
                        ]));
                    }
                    Screen::Tasks => {
                        form_lines.push(Line::from(vec![
                            Span::styled("Title: ", styles::accent()),
                            Span::styled(ui.form.title.as_str(), styles::text()),
                        ]));
                        form_lines.push(Line::from(vec![
                            Span::styled("Kind:  ", styles::text_dim()),
                            Span::styled(ui.form.kind.label(), styles::task_kind(&ui.form.kind)),
                        ]));
                    }
                    Screen::Dashboard => {}
                }
                form_lines.push(Line::from(""));
                form_lines.push(Line::from(vec![
                    Span::styled("Enter", styles::key_hint()),
                    Span::styled(" save  ", styles::text_dim()),
                    Span::styled("Tab", styles::key_hint()),
                    Span::styled(
                        if screen == Screen::Tasks {
                            " kind  "
                        } else {
                            " field  "
                        },
                        styles::text_dim(),
                    ),
                    Span::styled("Esc", styles::key_hint()),
                    Span::styled(" cancel", styles::text_dim()),
                ]));

                f.render_widget(Paragraph::new(form_lines), inner);
            }

            // ---------------- Help Modal ----------------
            if ui.help_open {
                let help_width = (area.width * 70 / 100).min(48).max(30);
                let help_height = 17u16.min(area.height.saturating_sub(2));
                let help_x = (area.width.saturating_sub(help_width)) / 2;
                let help_y = (area.height.saturating_sub(help_height)) / 2;

                let help_rect = Rect {
                    x: help_x,
                    y: help_y,
                    width: help_width,
                    height: help_height,
                };

                f.render_widget(Clear, help_rect);

                let block = Block::default()
                    .borders(Borders::ALL)
                    .border_style(styles::border_focused())
                    .title(" Help - Press ? or Esc to close ");
                let inner = block.inner(help_rect);
                f.render_widget(block, help_rect);

                let help_lines = vec![
                    Line::from(vec![Span::styled("SCREENS", styles::section_header())]),
                    Line::from(vec![
                        Span::styled("  1-4     ", styles::key_hint()),
                        Span::styled("Dashboard / Leads / Deals / Tasks", styles::text()),
                    ]),
                    Line::from(vec![
                        Span::styled("  d l e t ", styles::key_hint()),
                        Span::styled("Same screens by letter", styles::text()),
                    ]),
                    Line::from(""),
                    Line::from(vec![Span::styled("DATA", styles::section_header())]),
                    Line::from(vec![
                        Span::styled("  r       ", styles::key_hint()),
                        Span::styled("Reload the current screen", styles::text()),
                    ]),
                    Line::from(vec![
                        Span::styled("  a       ", styles::key_hint()),
                        Span::styled("Add a lead / deal / task", styles::text()),
                    ]),
                    Line::from(vec![
                        Span::styled("  j/k ↑↓  ", styles::key_hint()),
                        Span::styled("Move selection", styles::text()),
                    ]),
                    Line::from(""),
                    Line::from(vec![Span::styled("LEADS", styles::section_header())]),
                    Line::from(vec![
                        Span::styled("  q       ", styles::key_hint()),
                        Span::styled("Qualify the selected lead", styles::text()),
                    ]),
                    Line::from(vec![
                        Span::styled("  x       ", styles::key_hint()),
                        Span::styled("Mark the selected lead lost", styles::text()),
                    ]),
                    Line::from(""),
                    Line::from(vec![
                        Span::styled("  q/Esc   ", styles::key_hint()),
                        Span::styled("Quit (Esc on the Leads screen)", styles::text()),
                    ]),
                ];

                f.render_widget(Paragraph::new(help_lines), inner);
            }
        })?;

        drop(snapshot);

        if !event::poll(Duration::from_millis(50))? {
            continue;
        }

        let ev = event::read()?;
        let CEvent::Key(KeyEvent { code, .. }) = ev else {
            continue;
        };

        // ---------- HELP MODE ----------
        if ui.help_open {
            match code {
                KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q') => {
                    ui.help_open = false;
                }
                _ => {}
            }
            continue;
        }

        // ---------- FORM MODE ----------
        if ui.form_open {
            let screen = state.read().await.screen;
            match code {
                KeyCode::Esc => {
                    ui.form_open = false;
                }
                KeyCode::Tab => {
                    if screen == Screen::Tasks {
                        ui.form.kind = ui.form.kind.next();
                    } else {
                        ui.form.field = (ui.form.field + 1) % 2;
                    }
                }
                KeyCode::Backspace => {
                    form_input_mut(&mut ui.form, screen).pop();
                }
                KeyCode::Char(c) => {
                    form_input_mut(&mut ui.form, screen).push(c);
                }
                KeyCode::Enter => {
                    let cmd = match screen {
                        Screen::Leads => Some(SyncCommand::AddLead(NewLead {
                            name: ui.form.name.trim().to_string(),
                            email: ui.form.email.trim().to_string(),
                        })),
                        Screen::Deals => Some(SyncCommand::AddDeal(NewDeal {
                            title: ui.form.title.trim().to_string(),
                            value: parse_or_zero(&ui.form.value),
                        })),
                        Screen::Tasks => Some(SyncCommand::AddTask(NewTask {
                            title: ui.form.title.trim().to_string(),
                            kind: ui.form.kind,
                        })),
                        Screen::Dashboard => None,
                    };
                    if let Some(cmd) = cmd {
                        let _ = command_tx.send(cmd).await;
                    }
                    // Text inputs reset for the next entry; the task kind sticks
                    ui.form.name.clear();
                    ui.form.email.clear();
                    ui.form.title.clear();
                    ui.form.value.clear();
                    ui.form.field = 0;
                    ui.form_open = false;
                }
                _ => {}
            }
            continue;
        }

        // ---------- NORMAL MODE ----------
        let screen = state.read().await.screen;

        let switch_to = match code {
            KeyCode::Char('1') | KeyCode::Char('d') => Some(Screen::Dashboard),
            KeyCode::Char('2') | KeyCode::Char('l') => Some(Screen::Leads),
            KeyCode::Char('3') | KeyCode::Char('e') => Some(Screen::Deals),
            KeyCode::Char('4') | KeyCode::Char('t') => Some(Screen::Tasks),
            _ => None,
        };
        if let Some(target) = switch_to {
            state.write().await.screen = target;
            ui.selected = 0;
            let _ = command_tx.send(SyncCommand::Load(target.resource())).await;
            continue;
        }

        match code {
            KeyCode::Char('?') => {
                ui.help_open = true;
            }
            KeyCode::Char('r') => {
                let _ = command_tx.send(SyncCommand::Load(screen.resource())).await;
            }
            KeyCode::Char('a') if screen != Screen::Dashboard => {
                ui.form_open = true;
                ui.form.field = 0;
            }
            KeyCode::Char('j') | KeyCode::Down => {
                let rows = visible_rows(&*state.read().await);
                if rows > 0 && ui.selected + 1 < rows {
                    ui.selected += 1;
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                ui.selected = ui.selected.saturating_sub(1);
            }
            KeyCode::Char('q') if screen == Screen::Leads => {
                if let Some(id) = selected_lead_id(&*state.read().await, ui.selected) {
                    let _ = command_tx
                        .send(SyncCommand::SetLeadStatus {
                            id,
                            status: LeadStatus::Qualified,
                        })
                        .await;
                }
            }
            KeyCode::Char('x') if screen == Screen::Leads => {
                if let Some(id) = selected_lead_id(&*state.read().await, ui.selected) {
                    let _ = command_tx
                        .send(SyncCommand::SetLeadStatus {
                            id,
                            status: LeadStatus::Lost,
                        })
                        .await;
                }
            }
            KeyCode::Char('q') => break,
            KeyCode::Esc => break,
            _ => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unparsable_deal_value_counts_as_zero() {
        assert_eq!(parse_or_zero("12000"), 12000.0);
        assert_eq!(parse_or_zero(" 3500.5 "), 3500.5);
        assert_eq!(parse_or_zero("twelve"), 0.0);
        assert_eq!(parse_or_zero(""), 0.0);
    }

    #[test]
    fn test_empty_state_wording_is_distinct_per_section() {
        let sections = [
            BodySection::Leads,
            BodySection::Deals,
            BodySection::Tasks,
            BodySection::Pipeline,
            BodySection::RecentActivity,
        ];

        assert_eq!(BodySection::Leads.empty_text(), "No leads yet");
        assert_eq!(BodySection::Deals.empty_text(), "No deals yet");
        assert_eq!(BodySection::Tasks.empty_text(), "No tasks yet");
        assert_eq!(BodySection::Pipeline.empty_text(), "No data yet");
        assert_eq!(
            BodySection::RecentActivity.empty_text(),
            "No recent activity"
        );

        // No two sections may share a placeholder line
        for (i, a) in sections.iter().enumerate() {
            for b in &sections[i + 1..] {
                assert_ne!(a.empty_text(), b.empty_text());
            }
        }
    }

    #[test]
    fn test_form_focus_follows_screen_and_field() {
        let mut form = AddForm::default();
        form_input_mut(&mut form, Screen::Leads).push_str("Ada");
        assert_eq!(form.name, "Ada");

        form.field = 1;
        form_input_mut(&mut form, Screen::Leads).push_str("ada@example.com");
        assert_eq!(form.email, "ada@example.com");

        form_input_mut(&mut form, Screen::Deals).push_str("4500");
        assert_eq!(form.value, "4500");

        form.field = 0;
        form_input_mut(&mut form, Screen::Tasks).push_str("Call back");
        assert_eq!(form.title, "Call back");
    }
}
