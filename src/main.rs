use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use std::{
    io::{self, stdout, Stdout},
    time::{Duration, Instant},
};

use blockfall::game::{CellView, Command, Game, GameEvent, PaletteColor, GRID_HEIGHT, GRID_WIDTH};

// ============================================================================
// Visual Constants
// ============================================================================

const CELL_WIDTH: u16 = 2;
const BLOCK_CHAR: &str = "██";
const EMPTY_CHAR: &str = "  ";
const SETTLED_COLOR: Color = Color::Gray;

// Upper bound on how long one loop iteration waits for input
const FRAME_DURATION: Duration = Duration::from_millis(16);

// ============================================================================
// Color Mapping
// ============================================================================

fn palette_color(color: PaletteColor) -> Color {
    match color {
        PaletteColor::Red => Color::Red,
        PaletteColor::Green => Color::Green,
        PaletteColor::Blue => Color::Blue,
        PaletteColor::Yellow => Color::Yellow,
        PaletteColor::Cyan => Color::Cyan,
    }
}

// ============================================================================
// Rendering
// ============================================================================

fn render(frame: &mut Frame, game: &Game, lines_cleared: u32) {
    let area = frame.size();

    render_game(frame, game, lines_cleared, area);
    if game.is_game_over() {
        render_game_over(frame, game, lines_cleared, area);
    }
}

fn render_game(frame: &mut Frame, game: &Game, lines_cleared: u32, area: Rect) {
    let grid_display_width = (GRID_WIDTH as u16 * CELL_WIDTH) + 2;
    let grid_display_height = GRID_HEIGHT as u16 + 2;
    let info_width = 14;
    let total_width = grid_display_width + info_width + 2;
    let total_height = grid_display_height + 3;

    // Center everything
    let main_area = centered_rect(total_width, total_height, area);

    // Split vertically first: game area and controls
    let vertical = Layout::vertical([
        Constraint::Length(grid_display_height),
        Constraint::Fill(1),
    ])
    .split(main_area);

    let game_row = vertical[0];

    // Layout: [Grid][Info]
    let horizontal = Layout::horizontal([
        Constraint::Length(grid_display_width),
        Constraint::Length(info_width),
    ])
    .split(game_row);

    // Render game grid
    render_grid(frame, game, horizontal[0]);

    // Render score panel
    render_info(frame, game, lines_cleared, horizontal[1]);

    // Render controls hint below
    let controls_area = Rect {
        x: area.x,
        y: game_row.y + game_row.height,
        width: area.width,
        height: 2,
    };

    if controls_area.y + 1 < area.height {
        let controls = Paragraph::new(vec![Line::from(
            "←→/AD: Move | ↓/S: Soft drop | Space/↑/W: Rotate | Q/ESC: Quit",
        )])
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(controls, controls_area);
    }
}

fn render_grid(frame: &mut Frame, game: &Game, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Blockfall ")
        .title_alignment(Alignment::Center);

    let inner = block.inner(area);
    frame.render_widget(block, area);

    // Settled cells and the active piece, composed by the core
    let visual_grid = game.render_grid();

    let lines: Vec<Line> = visual_grid
        .iter()
        .map(|row| {
            let spans: Vec<Span> = row
                .iter()
                .map(|cell| match cell {
                    CellView::Empty => Span::raw(EMPTY_CHAR),
                    CellView::Settled => {
                        Span::styled(BLOCK_CHAR, Style::default().fg(SETTLED_COLOR))
                    }
                    CellView::Active(color) => {
                        Span::styled(BLOCK_CHAR, Style::default().fg(palette_color(*color)))
                    }
                })
                .collect();
            Line::from(spans)
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_info(frame: &mut Frame, game: &Game, lines_cleared: u32, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Info ")
        .title_alignment(Alignment::Center);

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled("Score", Style::default().fg(Color::Yellow))),
        Line::from(format!("{}", game.score)),
        Line::from(""),
        Line::from(Span::styled("Lines", Style::default().fg(Color::Cyan))),
        Line::from(format!("{}", lines_cleared)),
    ];

    let paragraph = Paragraph::new(lines).alignment(Alignment::Center);
    frame.render_widget(paragraph, inner);
}

fn render_game_over(frame: &mut Frame, game: &Game, lines_cleared: u32, area: Rect) {
    // Popup drawn over the board rendered by render_game
    let text = vec![
        Line::from(""),
        Line::from(Span::styled("GAME OVER", Style::default().fg(Color::Red))),
        Line::from(""),
        Line::from(format!("Score: {}", game.score)),
        Line::from(format!("Lines: {}", lines_cleared)),
        Line::from(""),
        Line::from(Span::styled(
            "R to play again",
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(Span::styled(
            "ESC to quit",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let paragraph = Paragraph::new(text).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Game Over ")
            .title_alignment(Alignment::Center)
            .style(Style::default().bg(Color::Black)),
    );

    let popup_area = centered_rect(24, 11, area);
    frame.render_widget(paragraph, popup_area);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let horizontal = Layout::horizontal([
        Constraint::Fill(1),
        Constraint::Length(width.min(area.width)),
        Constraint::Fill(1),
    ])
    .split(area);

    let vertical = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(height.min(area.height)),
        Constraint::Fill(1),
    ])
    .split(horizontal[1]);

    vertical[1]
}

// ============================================================================
// Input
// ============================================================================

fn key_command(code: KeyCode) -> Option<Command> {
    match code {
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => Some(Command::MoveLeft),
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => Some(Command::MoveRight),
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => {
            Some(Command::SetSoftDrop(true))
        }
        KeyCode::Up | KeyCode::Char(' ') | KeyCode::Char('w') | KeyCode::Char('W') => {
            Some(Command::RotateCw)
        }
        _ => None,
    }
}

// ============================================================================
// Main Loop
// ============================================================================

fn run(terminal: &mut Terminal<CrosstermBackend<Stdout>>, game: &mut Game) -> io::Result<()> {
    let mut lines_cleared = 0;
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|frame| render(frame, game, lines_cleared))?;

        // Apply every key queued since the last frame, in arrival order
        let mut timeout = FRAME_DURATION;
        while event::poll(timeout)? {
            timeout = Duration::ZERO;
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                KeyCode::Char('r') | KeyCode::Char('R') if game.is_game_over() => {
                    game.restart();
                }
                code => {
                    if let Some(command) = key_command(code) {
                        game.apply(command);
                    }
                }
            }
        }

        let now = Instant::now();
        game.apply(Command::Tick(now.duration_since(last_tick).as_secs_f32()));
        last_tick = now;

        for event in game.take_events() {
            match event {
                GameEvent::LinesCleared(count) => lines_cleared += count,
                GameEvent::GameRestarted => lines_cleared = 0,
                _ => {}
            }
        }
    }
}

fn main() -> io::Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;

    let mut game = Game::new();
    let result = Terminal::new(CrosstermBackend::new(stdout()))
        .and_then(|mut terminal| run(&mut terminal, &mut game));

    // Restore terminal before surfacing any error
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    result?;

    println!("Final score: {}", game.score);
    Ok(())
}
