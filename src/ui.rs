use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
};

use crate::app::{App, AppState};

pub fn render(f: &mut Frame, app: &App) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(2),
        ])
        .split(f.area());

    render_header(f, app, layout[0]);

    match app.state {
        AppState::Input => render_input(f, app, layout[1]),
        AppState::Loading => render_loading(f, "Fetching returns & sampling portfolios...", layout[1]),
        AppState::Dashboard => render_dashboard(f, app, layout[1]),
    }

    render_footer(f, app, layout[2]);
}

fn render_header(f: &mut Frame, app: &App, area: ratatui::layout::Rect) {
    let mut spans = vec![
        Span::styled(
            " Frontier TUI ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::styled(
            match app.state {
                AppState::Input => "Input",
                AppState::Loading => "Loading",
                AppState::Dashboard => "Dashboard",
            },
            Style::default().fg(Color::Yellow),
        ),
    ];

    if !app.tickers.is_empty() {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            app.tickers.join(", "),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            format!("{} portfolios", app.params.count),
            Style::default().fg(Color::Gray),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn render_footer(f: &mut Frame, app: &App, area: ratatui::layout::Rect) {
    let hint = match app.state {
        AppState::Input => "Enter: simulate | Esc: quit",
        AppState::Loading => "Working...",
        AppState::Dashboard => "r: change universe | q/Esc: quit",
    };

    let footer = Paragraph::new(Line::from(vec![
        Span::styled(" Controls: ", Style::default().fg(Color::Gray)),
        Span::styled(hint, Style::default().fg(Color::White)),
    ]))
    .block(Block::default().borders(Borders::ALL));

    f.render_widget(footer, area);
}

fn render_loading(f: &mut Frame, message: &str, area: ratatui::layout::Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(45),
            Constraint::Length(3),
            Constraint::Percentage(45),
        ])
        .split(area);

    let text = Paragraph::new(Line::from(Span::styled(
        message,
        Style::default().fg(Color::Yellow),
    )))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL));

    f.render_widget(text, chunks[1]);
}

fn render_input(f: &mut Frame, app: &App, area: ratatui::layout::Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(area);

    let input = Paragraph::new(Line::from(vec![
        Span::styled(&app.input, Style::default().fg(Color::White)),
        Span::styled("_", Style::default().fg(Color::Cyan)),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Asset Universe (comma-separated tickers) "),
    );
    f.render_widget(input, chunks[0]);

    let help = Paragraph::new(vec![
        Line::from("Each run samples random long-only portfolios over the universe,"),
        Line::from("measures their risk/return, and extracts the efficient frontier."),
        Line::from(format!(
            "Range: {} | Seed: {} | Bucket decimals: {}",
            app.params.range, app.params.seed, app.params.frontier.bucket_decimals
        )),
    ])
    .style(Style::default().fg(Color::Gray))
    .block(Block::default().borders(Borders::ALL).title(" About "));
    f.render_widget(help, chunks[1]);

    if let Some(err) = &app.error_msg {
        let error = Paragraph::new(err.as_str())
            .style(Style::default().fg(Color::Red))
            .block(Block::default().borders(Borders::ALL).title(" Error "));
        f.render_widget(error, chunks[2]);
    }
}

fn render_dashboard(f: &mut Frame, app: &App, area: ratatui::layout::Rect) {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Percentage(100)])
        .split(area);

    let (Some(dataset), Some(analysis)) = (&app.dataset, &app.analysis) else {
        return;
    };

    // Split into Chart (Left) and Info (Right)
    let dashboard_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(75), Constraint::Percentage(25)])
        .split(main_chunks[0]);

    let cloud: Vec<(f64, f64)> = dataset.iter().map(|p| (p.risk, p.ret)).collect();
    let curve: Vec<(f64, f64)> = analysis.curve.iter().map(|p| (p.risk, p.ret)).collect();
    let boundary: Vec<(f64, f64)> = analysis.boundary.iter().map(|p| (p.risk, p.ret)).collect();
    let efficient = vec![(analysis.most_efficient.risk, analysis.most_efficient.ret)];

    let datasets = vec![
        Dataset::default()
            .name("Portfolios")
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Cyan))
            .data(&cloud),
        Dataset::default()
            .name("Division")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::DarkGray))
            .data(&boundary),
        Dataset::default()
            .name("Efficient Frontier")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Yellow))
            .data(&curve),
        Dataset::default()
            .name("Most Efficient")
            .marker(symbols::Marker::Block)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Green))
            .data(&efficient),
    ];

    let min_risk = cloud.iter().map(|(x, _)| *x).fold(f64::INFINITY, f64::min);
    let max_risk = analysis.boundary[1].risk;
    let min_ret = cloud.iter().map(|(_, y)| *y).fold(f64::INFINITY, f64::min);
    let max_ret = cloud.iter().map(|(_, y)| *y).fold(f64::NEG_INFINITY, f64::max);

    let x_bounds = [min_risk * 0.95, max_risk * 1.02];
    let y_pad = ((max_ret - min_ret) * 0.05).max(0.1);
    let y_bounds = [min_ret - y_pad, max_ret + y_pad];

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .title(Span::styled(
                    format!(
                        " Risk/Return Profiles - {} Randomly Generated Portfolio Combinations ",
                        dataset.len()
                    ),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL),
        )
        .x_axis(
            Axis::default()
                .title("Portfolio Risk")
                .style(Style::default().fg(Color::Gray))
                .bounds(x_bounds)
                .labels(vec![
                    Span::styled(format!("{:.1}%", x_bounds[0]), Style::default().fg(Color::Gray)),
                    Span::styled(format!("{:.1}%", x_bounds[1]), Style::default().fg(Color::Gray)),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("Portfolio Return")
                .style(Style::default().fg(Color::Gray))
                .bounds(y_bounds)
                .labels(vec![
                    Span::styled(format!("{:.1}%", y_bounds[0]), Style::default().fg(Color::Gray)),
                    Span::styled(format!("{:.1}%", y_bounds[1]), Style::default().fg(Color::Gray)),
                ]),
        );

    f.render_widget(chart, dashboard_chunks[0]);

    // Render Info Panel
    let upper_half = dataset
        .iter()
        .filter(|p| p.ret >= analysis.most_efficient.ret)
        .count();

    let info_text = vec![
        Line::from(Span::styled(
            "Most Efficient Portfolio",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )),
        Line::from(format!("Index:  #{}", analysis.most_efficient.index)),
        Line::from(format!("Risk:   {:.2}%", analysis.most_efficient.risk)),
        Line::from(format!("Return: {:.2}%", analysis.most_efficient.ret)),
        Line::from(""),
        Line::from(Span::styled(
            "Frontier",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )),
        Line::from(format!("Curve points: {}", analysis.curve.len())),
        Line::from(format!("Upper half:   {}", upper_half)),
        Line::from(format!(
            "Risk span:    {:.2}%-{:.2}%",
            analysis.curve.first().map(|p| p.risk).unwrap_or(0.0),
            analysis.curve.last().map(|p| p.risk).unwrap_or(0.0),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Run",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(format!("Universe: {}", app.tickers.join(", "))),
        Line::from(format!("Range:    {}", app.params.range)),
        Line::from(format!("Samples:  {}", dataset.len())),
        Line::from(format!("Seed:     {}", app.params.seed)),
    ];

    let info_block = Paragraph::new(info_text)
        .block(Block::default().borders(Borders::ALL).title(" Details "))
        .style(Style::default().fg(Color::White));

    f.render_widget(info_block, dashboard_chunks[1]);
}
