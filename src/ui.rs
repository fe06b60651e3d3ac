use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use mortgage_calc::{
    build_schedule, calculate, delete_scenario, list_scenarios, save_scenario, CalculatorError,
    LoanScenario, PaymentBreakdown, SaveOutcome, SavedScenario, YearSummary,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use rusqlite::Connection;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Calculator,
    Scenarios,
    Schedule,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Calculator => Page::Scenarios,
            Page::Scenarios => Page::Schedule,
            Page::Schedule => Page::Calculator,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Calculator => Page::Schedule,
            Page::Scenarios => Page::Calculator,
            Page::Schedule => Page::Scenarios,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Calculator => "Calculator",
            Page::Scenarios => "Saved Scenarios",
            Page::Schedule => "Schedule",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Normal,
    /// Typing a name for the scenario about to be saved
    Naming(String),
}

pub const FIELD_LABELS: [&str; 7] = [
    "Purchase price",
    "Down payment",
    "Interest rate %",
    "Term (years)",
    "Property tax / yr",
    "Insurance / yr",
    "HOA dues / yr",
];

pub struct App {
    pub fields: [String; 7],
    pub selected_field: usize,
    pub current_page: Page,
    pub mode: Mode,
    pub result: Result<PaymentBreakdown, CalculatorError>,
    /// Snapshot shown verbatim until the user edits a field
    pub loaded: Option<SavedScenario>,
    pub saved: Vec<SavedScenario>,
    pub scenarios_state: TableState,
    pub schedule_state: TableState,
    pub status: Option<String>,
    pending_save: Option<SavedScenario>,
    pending_delete: Option<String>,
}

impl App {
    pub fn new(saved: Vec<SavedScenario>) -> Self {
        let mut scenarios_state = TableState::default();
        if !saved.is_empty() {
            scenarios_state.select(Some(0));
        }

        let mut schedule_state = TableState::default();
        schedule_state.select(Some(0));

        let mut app = Self {
            fields: Default::default(),
            selected_field: 0,
            current_page: Page::Calculator,
            mode: Mode::Normal,
            result: calculate(&LoanScenario::new(0.0, 0.0, 0.0, 1)),
            loaded: None,
            saved,
            scenarios_state,
            schedule_state,
            status: None,
            pending_save: None,
            pending_delete: None,
        };
        app.set_inputs(&LoanScenario::new(500_000.0, 100_000.0, 6.5, 30));
        app
    }

    fn set_inputs(&mut self, inputs: &LoanScenario) {
        self.fields = [
            inputs.price.to_string(),
            inputs.down_payment.to_string(),
            inputs.annual_rate_percent.to_string(),
            inputs.term_years.to_string(),
            inputs.annual_property_tax.to_string(),
            inputs.annual_insurance.to_string(),
            inputs.annual_hoa.to_string(),
        ];
        self.recompute();
    }

    /// Parse the form. Blank escrow fields count as 0.
    pub fn current_inputs(&self) -> Result<LoanScenario, String> {
        fn amount(label: &str, text: &str, optional: bool) -> Result<f64, String> {
            let text = text.trim();
            if text.is_empty() && optional {
                return Ok(0.0);
            }
            text.parse::<f64>()
                .map_err(|_| format!("{}: not a number", label))
        }

        let term = self.fields[3]
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("{}: not a whole number", FIELD_LABELS[3]))?;

        Ok(LoanScenario {
            price: amount(FIELD_LABELS[0], &self.fields[0], false)?,
            down_payment: amount(FIELD_LABELS[1], &self.fields[1], true)?,
            annual_rate_percent: amount(FIELD_LABELS[2], &self.fields[2], false)?,
            term_years: term,
            annual_property_tax: amount(FIELD_LABELS[4], &self.fields[4], true)?,
            annual_insurance: amount(FIELD_LABELS[5], &self.fields[5], true)?,
            annual_hoa: amount(FIELD_LABELS[6], &self.fields[6], true)?,
        })
    }

    pub fn recompute(&mut self) {
        self.result = match self.current_inputs() {
            Ok(inputs) => calculate(&inputs),
            Err(reason) => Err(CalculatorError::InvalidInput {
                field: "form",
                reason,
            }),
        };
    }

    /// Outputs to display: a loaded snapshot wins over a fresh calculation
    pub fn displayed_result(&self) -> Result<PaymentBreakdown, CalculatorError> {
        match &self.loaded {
            Some(snapshot) => Ok(snapshot.outputs),
            None => self.result.clone(),
        }
    }

    pub fn yearly_summary(&self) -> Vec<YearSummary> {
        match self.current_inputs().ok().and_then(|inputs| build_schedule(&inputs).ok()) {
            Some(schedule) => schedule.yearly_summary(),
            None => Vec::new(),
        }
    }

    fn edit_field<F: FnOnce(&mut String)>(&mut self, f: F) {
        f(&mut self.fields[self.selected_field]);
        self.loaded = None;
        self.recompute();
    }

    pub fn next_field(&mut self) {
        self.selected_field = (self.selected_field + 1) % self.fields.len();
    }

    pub fn previous_field(&mut self) {
        self.selected_field = (self.selected_field + self.fields.len() - 1) % self.fields.len();
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    pub fn selected_scenario(&self) -> Option<&SavedScenario> {
        self.scenarios_state.selected().and_then(|i| self.saved.get(i))
    }

    /// Put a saved snapshot's inputs back into the form, byte-for-byte
    pub fn load_selected(&mut self) {
        if let Some(snapshot) = self.selected_scenario().cloned() {
            self.set_inputs(&snapshot.inputs);
            self.status = Some(format!("Loaded \"{}\"", snapshot.name));
            self.loaded = Some(snapshot);
            self.current_page = Page::Calculator;
        }
    }

    fn confirm_name(&mut self, name: &str) {
        self.mode = Mode::Normal;

        let inputs = match self.current_inputs() {
            Ok(inputs) => inputs,
            Err(reason) => {
                self.status = Some(reason);
                return;
            }
        };

        match SavedScenario::new(name, inputs) {
            Ok(snapshot) => self.pending_save = Some(snapshot),
            Err(e) => self.status = Some(e.to_string()),
        }
    }

    pub fn take_pending_save(&mut self) -> Option<SavedScenario> {
        self.pending_save.take()
    }

    pub fn take_pending_delete(&mut self) -> Option<String> {
        self.pending_delete.take()
    }

    pub fn set_saved(&mut self, saved: Vec<SavedScenario>) {
        self.saved = saved;

        // A deleted snapshot stops being shown as saved; the form keeps its inputs
        let still_stored = |loaded: &SavedScenario| self.saved.iter().any(|s| s.id == loaded.id);
        if !self.loaded.as_ref().map_or(true, still_stored) {
            self.loaded = None;
        }

        let selected = match self.scenarios_state.selected() {
            _ if self.saved.is_empty() => None,
            Some(i) => Some(i.min(self.saved.len() - 1)),
            None => Some(0),
        };
        self.scenarios_state.select(selected);
    }

    fn move_selection(state: &mut TableState, len: usize, forward: bool) {
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) if forward => {
                if i >= len - 1 {
                    0
                } else {
                    i + 1
                }
            }
            Some(i) => {
                if i == 0 {
                    len - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        state.select(Some(i));
    }

    /// Apply one key press. Returns true when the app should quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if let Mode::Naming(name) = &mut self.mode {
            match key.code {
                KeyCode::Esc => self.mode = Mode::Normal,
                KeyCode::Enter => {
                    let name = name.clone();
                    self.confirm_name(&name);
                }
                KeyCode::Backspace => {
                    name.pop();
                }
                KeyCode::Char(c) => name.push(c),
                _ => {}
            }
            return false;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Tab => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    self.previous_page();
                } else {
                    self.next_page();
                }
            }
            KeyCode::BackTab => self.previous_page(),
            _ => match self.current_page {
                Page::Calculator => self.handle_calculator_key(key),
                Page::Scenarios => self.handle_scenarios_key(key),
                Page::Schedule => {
                    let len = self.yearly_summary().len();
                    match key.code {
                        KeyCode::Down | KeyCode::Char('j') => {
                            Self::move_selection(&mut self.schedule_state, len, true)
                        }
                        KeyCode::Up | KeyCode::Char('k') => {
                            Self::move_selection(&mut self.schedule_state, len, false)
                        }
                        _ => {}
                    }
                }
            },
        }

        false
    }

    fn handle_calculator_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Down | KeyCode::Enter => self.next_field(),
            KeyCode::Up => self.previous_field(),
            KeyCode::Char(c) if c.is_ascii_digit() || c == '.' => self.edit_field(|f| f.push(c)),
            KeyCode::Backspace => self.edit_field(|f| {
                f.pop();
            }),
            KeyCode::Delete => self.edit_field(|f| f.clear()),
            KeyCode::Char('s') => {
                let name = self.loaded.as_ref().map(|s| s.name.clone()).unwrap_or_default();
                self.mode = Mode::Naming(name);
                self.status = None;
            }
            KeyCode::Char('r') => {
                self.loaded = None;
                self.set_inputs(&LoanScenario::new(500_000.0, 100_000.0, 6.5, 30));
                self.status = Some("Reset to defaults".to_string());
            }
            _ => {}
        }
    }

    fn handle_scenarios_key(&mut self, key: KeyEvent) {
        let len = self.saved.len();
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => {
                Self::move_selection(&mut self.scenarios_state, len, true)
            }
            KeyCode::Up | KeyCode::Char('k') => {
                Self::move_selection(&mut self.scenarios_state, len, false)
            }
            KeyCode::Enter => self.load_selected(),
            KeyCode::Char('d') => {
                self.pending_delete = self.selected_scenario().map(|s| s.id.clone());
            }
            _ => {}
        }
    }
}

pub fn run_ui(app: &mut App, conn: &Connection) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app, conn);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    conn: &Connection,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if app.handle_key(key) {
                return Ok(());
            }
        }

        if let Some(snapshot) = app.take_pending_save() {
            app.status = Some(match save_scenario(conn, &snapshot)? {
                SaveOutcome::Saved => format!("Saved \"{}\"", snapshot.name),
                SaveOutcome::NameTaken => {
                    format!("\"{}\" already exists, pick another name", snapshot.name)
                }
            });
            app.set_saved(list_scenarios(conn)?);
        }

        if let Some(id) = app.take_pending_delete() {
            if delete_scenario(conn, &id)? {
                app.status = Some("Scenario deleted".to_string());
            }
            app.set_saved(list_scenarios(conn)?);
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::Calculator => {
            let content_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
                .split(chunks[1]);

            render_form(f, content_chunks[0], app);
            render_results(f, content_chunks[1], app);
        }
        Page::Scenarios => render_scenarios(f, chunks[1], app),
        Page::Schedule => render_schedule(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::Calculator, Page::Scenarios, Page::Schedule];

    let mut tab_spans = vec![];
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Saved: {}", app.saved.len()),
        Style::default().fg(Color::White),
    ));

    if let Ok(result) = app.displayed_result() {
        tab_spans.push(Span::raw("  |  "));
        tab_spans.push(Span::styled(
            format!("{:.2}/mo", result.monthly_payment),
            Style::default().fg(Color::Green),
        ));
    }

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(header, area);
}

fn render_form(f: &mut Frame, area: Rect, app: &App) {
    let mut lines = vec![Line::from("")];

    for (i, (label, value)) in FIELD_LABELS.iter().zip(app.fields.iter()).enumerate() {
        let selected = i == app.selected_field;
        let marker = if selected { "→ " } else { "  " };
        let value_style = if selected {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };

        lines.push(Line::from(vec![
            Span::styled(marker, Style::default().fg(Color::Green)),
            Span::styled(format!("{:<18}", label), Style::default().fg(Color::Cyan)),
            Span::styled(format!("{}{}", value, if selected { "▏" } else { "" }), value_style),
        ]));
        lines.push(Line::from(""));
    }

    if let Ok(inputs) = app.current_inputs() {
        lines.push(Line::from(Span::styled(
            format!(
                "  Down {:.1}%  ·  LTV {:.1}%",
                inputs.down_payment_percent(),
                inputs.loan_to_value() * 100.0
            ),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let form = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Loan Terms "),
    );

    f.render_widget(form, area);
}

fn money_line(label: &str, value: f64, color: Color) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("  {:<22}", label),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("{:>14.2}", value), Style::default().fg(color)),
    ])
}

fn render_results(f: &mut Frame, area: Rect, app: &App) {
    let title = match &app.loaded {
        Some(snapshot) => format!(" Payment - {} (saved) ", snapshot.name),
        None => " Payment ".to_string(),
    };

    let content = match app.displayed_result() {
        Ok(r) => vec![
            Line::from(""),
            money_line("Monthly payment", r.monthly_payment, Color::Green),
            Line::from("  ─────────────────────────────────────"),
            money_line("Principal + interest", r.monthly_principal_and_interest, Color::White),
            money_line("Property tax", r.monthly_taxes, Color::White),
            money_line("Insurance", r.monthly_insurance, Color::White),
            money_line("HOA", r.monthly_hoa, Color::White),
            Line::from("  ─────────────────────────────────────"),
            money_line("Loan amount", r.principal, Color::White),
            money_line("Total of payments", r.total_payment, Color::White),
            money_line("Total interest", r.total_interest, Color::Red),
        ],
        Err(e) => vec![
            Line::from(""),
            Line::from(Span::styled(
                format!("  {}", e),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )),
        ],
    };

    let panel = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(title),
    );

    f.render_widget(panel, area);
}

fn header_row(titles: &[&'static str]) -> Row<'static> {
    let cells = titles.iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });
    Row::new(cells).style(Style::default().bg(Color::DarkGray)).height(1)
}

fn render_scenarios(f: &mut Frame, area: Rect, app: &mut App) {
    let rows = app.saved.iter().map(|s| {
        Row::new(vec![
            Cell::from(truncate(&s.name, 24)),
            Cell::from(format!("{:.0}", s.outputs.principal)),
            Cell::from(format!("{}%", s.inputs.annual_rate_percent)),
            Cell::from(format!("{}y", s.inputs.term_years)),
            Cell::from(format!("{:.2}", s.outputs.monthly_payment))
                .style(Style::default().fg(Color::Green)),
            Cell::from(s.created_at.format("%Y-%m-%d").to_string()),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(26),
            Constraint::Length(12),
            Constraint::Length(8),
            Constraint::Length(6),
            Constraint::Length(12),
            Constraint::Length(12),
        ],
    )
    .header(header_row(&["Name", "Loan", "Rate", "Term", "Monthly", "Saved"]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Saved Scenarios "),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.scenarios_state);
}

fn render_schedule(f: &mut Frame, area: Rect, app: &mut App) {
    let years = app.yearly_summary();

    let rows = years.iter().map(|y| {
        Row::new(vec![
            Cell::from(format!("{}", y.year)),
            Cell::from(format!("{:.2}", y.principal_paid)),
            Cell::from(format!("{:.2}", y.interest_paid)).style(Style::default().fg(Color::Red)),
            Cell::from(format!("{:.2}", y.ending_balance)),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Length(16),
            Constraint::Length(16),
            Constraint::Length(16),
        ],
    )
    .header(header_row(&["Year", "Principal", "Interest", "Balance"]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Amortization - by Year "),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.schedule_state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = vec![];

    match &app.mode {
        Mode::Naming(name) => {
            status_spans.push(Span::styled(" Save as: ", Style::default().fg(Color::Cyan)));
            status_spans.push(Span::styled(
                format!("{}▏", name),
                Style::default().fg(Color::Yellow),
            ));
            status_spans.push(Span::raw("  (Enter save, Esc cancel)"));
        }
        Mode::Normal => {
            if let Some(status) = &app.status {
                status_spans.push(Span::styled(
                    format!(" {} ", status),
                    Style::default().fg(Color::Green),
                ));
                status_spans.push(Span::raw(" | "));
            }

            let hints: &[(&str, &str)] = match app.current_page {
                Page::Calculator => &[
                    ("0-9 .", " Edit"),
                    ("↑/↓", " Field"),
                    ("s", " Save"),
                    ("r", " Reset"),
                ],
                Page::Scenarios => &[("↑/↓", " Nav"), ("Enter", " Load"), ("d", " Delete")],
                Page::Schedule => &[("↑/↓", " Scroll")],
            };
            for (key, label) in hints {
                status_spans.push(Span::styled(*key, Style::default().fg(Color::Yellow)));
                status_spans.push(Span::raw(format!("{} | ", label)));
            }
            status_spans.push(Span::styled("Tab", Style::default().fg(Color::Yellow)));
            status_spans.push(Span::raw(" Page | "));
            status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
            status_spans.push(Span::raw(" Quit"));
        }
    }

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(app: &mut App, code: KeyCode) -> bool {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_str(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_defaults_compute_on_start() {
        let app = App::new(Vec::new());
        let result = app.displayed_result().unwrap();
        assert_eq!(result.principal, 400_000.0);
        assert!((result.monthly_payment - 2528.27).abs() < 0.01);
    }

    #[test]
    fn test_editing_recomputes() {
        let mut app = App::new(Vec::new());
        app.selected_field = 3;
        press(&mut app, KeyCode::Delete);
        assert!(app.displayed_result().is_err());

        type_str(&mut app, "15");
        let result = app.displayed_result().unwrap();
        assert!(result.monthly_principal_and_interest > 3000.0);
    }

    #[test]
    fn test_blank_escrow_fields_are_zero() {
        let mut app = App::new(Vec::new());
        app.selected_field = 6;
        press(&mut app, KeyCode::Delete);
        assert_eq!(app.current_inputs().unwrap().annual_hoa, 0.0);
    }

    #[test]
    fn test_zero_term_shows_error() {
        let mut app = App::new(Vec::new());
        app.fields[3] = "0".to_string();
        app.recompute();
        assert!(matches!(
            app.displayed_result(),
            Err(CalculatorError::InvalidInput { field: "termYears", .. })
        ));
    }

    #[test]
    fn test_save_flow_produces_snapshot() {
        let mut app = App::new(Vec::new());
        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.mode, Mode::Naming(String::new()));

        type_str(&mut app, "Cabin");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.mode, Mode::Normal);
        let snapshot = app.take_pending_save().unwrap();
        assert_eq!(snapshot.name, "Cabin");
        assert_eq!(snapshot.inputs.price, 500_000.0);
        assert!(app.take_pending_save().is_none());
    }

    #[test]
    fn test_naming_mode_swallows_quit() {
        let mut app = App::new(Vec::new());
        press(&mut app, KeyCode::Char('s'));
        assert!(!press(&mut app, KeyCode::Char('q')));
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.mode, Mode::Normal);
        assert!(app.take_pending_save().is_none());
        assert!(press(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn test_load_restores_inputs_and_stored_outputs() {
        let inputs = LoanScenario::new(333_333.33, 33_333.33, 7.125, 20)
            .with_escrow(4_321.0, 987.65, 0.0);
        let mut snapshot = SavedScenario::new("Odd numbers", inputs).unwrap();
        snapshot.outputs.monthly_payment = 42.0;

        let mut app = App::new(vec![snapshot]);
        app.current_page = Page::Scenarios;
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.current_page, Page::Calculator);
        assert_eq!(app.current_inputs().unwrap(), inputs);
        assert_eq!(app.displayed_result().unwrap().monthly_payment, 42.0);

        // Editing drops the snapshot and recomputes
        app.selected_field = 6;
        type_str(&mut app, "1");
        assert_ne!(app.displayed_result().unwrap().monthly_payment, 42.0);
        assert!(app.loaded.is_none());
    }

    #[test]
    fn test_delete_request() {
        let snapshot = SavedScenario::new("Gone", LoanScenario::new(1000.0, 0.0, 1.0, 1)).unwrap();
        let id = snapshot.id.clone();
        let mut app = App::new(vec![snapshot]);
        app.current_page = Page::Scenarios;

        press(&mut app, KeyCode::Char('d'));
        assert_eq!(app.take_pending_delete(), Some(id));

        app.set_saved(Vec::new());
        assert_eq!(app.scenarios_state.selected(), None);
    }

    #[test]
    fn test_deleting_loaded_snapshot_clears_it() {
        let kept = SavedScenario::new("Kept", LoanScenario::new(2000.0, 0.0, 2.0, 2)).unwrap();
        let mut gone = SavedScenario::new("Gone", LoanScenario::new(1000.0, 0.0, 1.0, 1)).unwrap();
        gone.outputs.monthly_payment = 42.0;

        let mut app = App::new(vec![gone.clone(), kept.clone()]);
        app.current_page = Page::Scenarios;
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.loaded.as_ref().map(|s| s.id.clone()), Some(gone.id.clone()));

        app.set_saved(vec![gone.clone(), kept.clone()]);
        assert!(app.loaded.is_some());

        app.set_saved(vec![kept]);
        assert!(app.loaded.is_none());
        assert_eq!(app.current_inputs().unwrap(), gone.inputs);
        assert_ne!(app.displayed_result().unwrap().monthly_payment, 42.0);
    }

    #[test]
    fn test_page_cycle() {
        let mut app = App::new(Vec::new());
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.current_page, Page::Scenarios);
        press(&mut app, KeyCode::BackTab);
        press(&mut app, KeyCode::BackTab);
        assert_eq!(app.current_page, Page::Schedule);
        assert_eq!(app.yearly_summary().len(), 30);
    }
}
