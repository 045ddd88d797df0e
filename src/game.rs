use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{SystemTime, UNIX_EPOCH};

// ============================================================================
// Configuration
// ============================================================================

pub const GRID_WIDTH: usize = 10;
pub const GRID_HEIGHT: usize = 20;

// Timing (in seconds)
pub const DROP_DELAY: f32 = 0.5;
pub const SOFT_DROP_DELAY: f32 = 0.05;

// Scoring
pub const SCORE_PER_LINE: u32 = 100;

pub const PALETTE_SIZE: usize = 5;

// ============================================================================
// Types
// ============================================================================

/// Rows of 0/1 cells. Row and column counts come from the matrix itself and
/// swap on every rotation.
pub type Shape = Vec<Vec<u8>>;

/// `GRID_HEIGHT` rows of `GRID_WIDTH` cells, 0 for empty and 1 for occupied.
pub type Grid = Vec<Vec<u8>>;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Position {
    pub x: i16,
    pub y: i16,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PaletteColor {
    Red,
    Green,
    Blue,
    Yellow,
    Cyan,
}

impl PaletteColor {
    pub const ALL: [PaletteColor; PALETTE_SIZE] = [
        PaletteColor::Red,
        PaletteColor::Green,
        PaletteColor::Blue,
        PaletteColor::Yellow,
        PaletteColor::Cyan,
    ];

    /// Palette entries are reused cyclically, so several indices share a color.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % PALETTE_SIZE]
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TetrominoType {
    I,
    O,
    T,
    S,
    Z,
    L,
    J,
}

impl TetrominoType {
    /// Catalog order. A shape's position here also picks its palette color.
    pub const ALL: [TetrominoType; 7] = [
        TetrominoType::I,
        TetrominoType::O,
        TetrominoType::T,
        TetrominoType::S,
        TetrominoType::Z,
        TetrominoType::L,
        TetrominoType::J,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn shape(self) -> Shape {
        let rows: &[&[u8]] = match self {
            TetrominoType::I => &[&[1, 1, 1, 1]],
            TetrominoType::O => &[&[1, 1], &[1, 1]],
            TetrominoType::T => &[&[0, 1, 0], &[1, 1, 1]],
            TetrominoType::S => &[&[1, 1, 0], &[0, 1, 1]],
            TetrominoType::Z => &[&[0, 1, 1], &[1, 1, 0]],
            TetrominoType::L => &[&[1, 1, 1], &[1, 0, 0]],
            TetrominoType::J => &[&[1, 1, 1], &[0, 0, 1]],
        };
        rows.iter().map(|row| row.to_vec()).collect()
    }

    pub fn color(self) -> PaletteColor {
        PaletteColor::from_index(self.index())
    }
}

/// Rotates a shape a quarter turn clockwise.
///
/// An `R x C` matrix becomes `C x R` with `new[j][R - 1 - i] = old[i][j]`.
/// Four applications give back the original matrix. Ragged rows are padded
/// with empty cells up to the widest row.
pub fn rotate(shape: &[Vec<u8>]) -> Shape {
    let rows = shape.len();
    let cols = shape.iter().map(Vec::len).max().unwrap_or(0);
    let mut rotated = vec![vec![0; rows]; cols];

    for (i, row) in shape.iter().enumerate() {
        for (j, &cell) in row.iter().enumerate() {
            rotated[j][rows - 1 - i] = cell;
        }
    }

    rotated
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Tetromino {
    pub shape: Shape,
    pub color: PaletteColor,
    pub position: Position,
}

impl Tetromino {
    /// Creates a piece at the spawn position: top row, horizontally centered.
    pub fn new(tetromino_type: TetrominoType) -> Self {
        let shape = tetromino_type.shape();
        let width = shape.first().map_or(0, Vec::len);
        Self {
            shape,
            color: tetromino_type.color(),
            position: Position {
                x: (GRID_WIDTH / 2) as i16 - (width / 2) as i16,
                y: 0,
            },
        }
    }

    pub fn new_at(tetromino_type: TetrominoType, x: i16, y: i16) -> Self {
        Self {
            shape: tetromino_type.shape(),
            color: tetromino_type.color(),
            position: Position { x, y },
        }
    }

    pub fn width(&self) -> usize {
        self.shape.first().map_or(0, Vec::len)
    }

    pub fn height(&self) -> usize {
        self.shape.len()
    }

    /// Absolute grid positions of every occupied cell.
    pub fn blocks(&self) -> Vec<Position> {
        self.shape
            .iter()
            .enumerate()
            .flat_map(|(i, row)| {
                row.iter()
                    .enumerate()
                    .filter(|(_, cell)| **cell != 0)
                    .map(move |(j, _)| (i, j))
            })
            .map(|(i, j)| Position {
                x: self.position.x + j as i16,
                y: self.position.y + i as i16,
            })
            .collect()
    }

    pub fn rotated(&self) -> Self {
        Self {
            shape: rotate(&self.shape),
            color: self.color,
            position: self.position,
        }
    }

    fn moved(&self, dx: i16, dy: i16) -> Self {
        Self {
            shape: self.shape.clone(),
            color: self.color,
            position: Position {
                x: self.position.x + dx,
                y: self.position.y + dy,
            },
        }
    }
}

/// What a renderer should draw in one cell of the board.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CellView {
    Empty,
    /// Locked occupancy. The grid keeps no color for these.
    Settled,
    Active(PaletteColor),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GameState {
    Playing,
    GameOver,
}

/// Discrete inputs accepted from the host loop.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Command {
    MoveLeft,
    MoveRight,
    RotateCw,
    SetSoftDrop(bool),
    /// Seconds elapsed since the previous tick.
    Tick(f32),
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum GameEvent {
    PieceMoved,
    PieceRotated,
    PieceLocked,
    LinesCleared(u32),
    GameRestarted,
    GameOver,
}

/// Read-only view handed to the renderer each frame.
#[derive(Clone, Copy, Debug)]
pub struct Snapshot<'a> {
    pub grid: &'a [Vec<u8>],
    pub piece: &'a Tetromino,
    pub score: u32,
    pub game_over: bool,
}

// ============================================================================
// Grid Operations
// ============================================================================

/// Returns true if `piece`, shifted by `(dx, dy)`, would leave the grid on the
/// left, right or bottom, or overlap an occupied cell.
///
/// Rows above the grid are not checked: pieces spawn at row 0 and only move
/// down.
pub fn collides(grid: &[Vec<u8>], piece: &Tetromino, dx: i16, dy: i16) -> bool {
    let height = grid.len() as i16;
    let width = grid.first().map_or(0, Vec::len) as i16;

    piece.blocks().into_iter().any(|block| {
        let x = block.x + dx;
        let y = block.y + dy;
        if x < 0 || x >= width || y >= height {
            return true;
        }
        y >= 0 && grid[y as usize][x as usize] != 0
    })
}

/// Writes the piece's cells into the grid as occupied. Color is not kept.
pub fn merge(grid: &mut [Vec<u8>], piece: &Tetromino) {
    for block in piece.blocks() {
        if block.x < 0 || block.y < 0 {
            continue;
        }
        if let Some(cell) = grid
            .get_mut(block.y as usize)
            .and_then(|row| row.get_mut(block.x as usize))
        {
            *cell = 1;
        }
    }
}

pub fn is_row_full(row: &[u8]) -> bool {
    !row.is_empty() && row.iter().all(|&cell| cell != 0)
}

/// Removes every full row, scanning bottom-up, and adds `SCORE_PER_LINE` to
/// `score` for each one. Returns the number of rows removed.
pub fn clear_lines(grid: &mut [Vec<u8>], score: &mut u32) -> u32 {
    let mut cleared = 0;
    let mut y = grid.len();

    while y > 0 {
        let row = y - 1;
        if is_row_full(&grid[row]) {
            // Shift everything above down one row and empty the top.
            grid[..=row].rotate_right(1);
            grid[0].fill(0);
            *score = score.saturating_add(SCORE_PER_LINE);
            cleared += 1;
            // Don't advance - the row above has shifted into this position
        } else {
            y -= 1;
        }
    }

    cleared
}

// ============================================================================
// Piece Provider Trait
// ============================================================================

pub trait PieceProvider {
    fn next_piece(&mut self) -> TetrominoType;
}

/// Uniform picks over the catalog from one generator seeded at construction.
pub struct RandomPieceProvider {
    rng: StdRng,
}

impl RandomPieceProvider {
    pub fn from_time() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_nanos() as u64);
        Self::with_seed(seed)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn pick_random(&mut self) -> (Shape, PaletteColor) {
        let tetromino_type = self.next_piece();
        (tetromino_type.shape(), tetromino_type.color())
    }
}

impl PieceProvider for RandomPieceProvider {
    fn next_piece(&mut self) -> TetrominoType {
        TetrominoType::ALL[self.rng.gen_range(0..TetrominoType::ALL.len())]
    }
}

/// Cycles through a fixed list. An empty list yields I pieces.
pub struct SequencePieceProvider {
    pieces: Vec<TetrominoType>,
    index: usize,
}

impl SequencePieceProvider {
    pub fn new(pieces: Vec<TetrominoType>) -> Self {
        Self { pieces, index: 0 }
    }
}

impl PieceProvider for SequencePieceProvider {
    fn next_piece(&mut self) -> TetrominoType {
        let piece = self
            .pieces
            .get(self.index % self.pieces.len().max(1))
            .copied()
            .unwrap_or(TetrominoType::I);
        self.index += 1;
        piece
    }
}

// ============================================================================
// Game
// ============================================================================

pub struct Game {
    pub grid: Grid,
    pub current_piece: Tetromino,
    pub score: u32,
    pub state: GameState,
    drop_timer: f32,
    drop_delay: f32,
    piece_provider: Box<dyn PieceProvider>,
    events: Vec<GameEvent>,
}

// ============================================================================
// Game Logic
// ============================================================================

impl Game {
    pub fn new() -> Self {
        Self::with_provider(Box::new(RandomPieceProvider::from_time()))
    }

    pub fn with_provider(mut provider: Box<dyn PieceProvider>) -> Self {
        // The first piece lands on an empty grid, so it cannot collide.
        let current_piece = Tetromino::new(provider.next_piece());

        Self {
            grid: vec![vec![0; GRID_WIDTH]; GRID_HEIGHT],
            current_piece,
            score: 0,
            state: GameState::Playing,
            drop_timer: 0.0,
            drop_delay: DROP_DELAY,
            piece_provider: provider,
            events: Vec::new(),
        }
    }

    pub fn with_grid(grid: Grid, current_piece: Tetromino) -> Self {
        Self {
            grid,
            current_piece,
            score: 0,
            state: GameState::Playing,
            drop_timer: 0.0,
            drop_delay: DROP_DELAY,
            piece_provider: Box::new(RandomPieceProvider::from_time()),
            events: Vec::new(),
        }
    }

    pub fn is_valid_position(&self, piece: &Tetromino) -> bool {
        !collides(&self.grid, piece, 0, 0)
    }

    pub fn spawn_next_piece(&mut self) {
        if self.state == GameState::GameOver {
            return;
        }
        self.current_piece = Tetromino::new(self.piece_provider.next_piece());

        if collides(&self.grid, &self.current_piece, 0, 0) {
            self.state = GameState::GameOver;
            self.events.push(GameEvent::GameOver);
        }
    }

    fn try_shift(&mut self, dx: i16, dy: i16) -> bool {
        if self.state != GameState::Playing {
            return false;
        }
        let moved = self.current_piece.moved(dx, dy);
        if self.is_valid_position(&moved) {
            self.current_piece = moved;
            self.events.push(GameEvent::PieceMoved);
            true
        } else {
            false
        }
    }

    pub fn move_left(&mut self) -> bool {
        self.try_shift(-1, 0)
    }

    pub fn move_right(&mut self) -> bool {
        self.try_shift(1, 0)
    }

    /// Rotates clockwise in place. A rotation that would collide is dropped;
    /// there are no wall kicks.
    pub fn rotate_piece(&mut self) -> bool {
        if self.state != GameState::Playing {
            return false;
        }
        let rotated = self.current_piece.rotated();
        if self.is_valid_position(&rotated) {
            self.current_piece = rotated;
            self.events.push(GameEvent::PieceRotated);
            true
        } else {
            false
        }
    }

    /// Selects the drop delay for the next tick only. Held soft drop has to be
    /// re-asserted before every tick.
    pub fn set_soft_drop(&mut self, active: bool) {
        if self.state != GameState::Playing {
            return;
        }
        self.drop_delay = if active { SOFT_DROP_DELAY } else { DROP_DELAY };
    }

    /// Advances gravity by `elapsed` seconds.
    pub fn tick(&mut self, elapsed: f32) {
        if self.state != GameState::Playing {
            return;
        }

        self.drop_timer += elapsed.max(0.0);
        if self.drop_timer >= self.drop_delay {
            if !self.try_shift(0, 1) {
                self.lock_and_spawn();
            }
            self.drop_timer = 0.0;
        }

        self.drop_delay = DROP_DELAY;
    }

    pub fn apply(&mut self, command: Command) {
        match command {
            Command::MoveLeft => {
                self.move_left();
            }
            Command::MoveRight => {
                self.move_right();
            }
            Command::RotateCw => {
                self.rotate_piece();
            }
            Command::SetSoftDrop(active) => self.set_soft_drop(active),
            Command::Tick(elapsed) => self.tick(elapsed),
        }
    }

    fn lock_and_spawn(&mut self) {
        merge(&mut self.grid, &self.current_piece);
        self.events.push(GameEvent::PieceLocked);

        let lines = clear_lines(&mut self.grid, &mut self.score);
        if lines > 0 {
            self.events.push(GameEvent::LinesCleared(lines));
        }

        self.spawn_next_piece();
    }

    /// Starts a new session: empty grid, zero score, fresh piece.
    pub fn restart(&mut self) {
        self.grid = vec![vec![0; GRID_WIDTH]; GRID_HEIGHT];
        self.score = 0;
        self.state = GameState::Playing;
        self.drop_timer = 0.0;
        self.drop_delay = DROP_DELAY;
        self.events.clear();

        self.spawn_next_piece();

        self.events.push(GameEvent::GameRestarted);
    }

    pub fn drop_delay(&self) -> f32 {
        self.drop_delay
    }

    pub fn drop_timer(&self) -> f32 {
        self.drop_timer
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            grid: &self.grid,
            piece: &self.current_piece,
            score: self.score,
            game_over: self.is_game_over(),
        }
    }

    /// Returns the visual grid state with the current piece overlaid
    pub fn render_grid(&self) -> Vec<Vec<CellView>> {
        let mut visual_grid: Vec<Vec<CellView>> = self
            .grid
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&cell| if cell != 0 { CellView::Settled } else { CellView::Empty })
                    .collect()
            })
            .collect();

        for block in self.current_piece.blocks() {
            if block.x < 0 || block.y < 0 {
                continue;
            }
            if let Some(cell) = visual_grid
                .get_mut(block.y as usize)
                .and_then(|row| row.get_mut(block.x as usize))
            {
                *cell = CellView::Active(self.current_piece.color);
            }
        }

        visual_grid
    }

    /// Takes and clears all pending events
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Check if a specific row is complete (all filled)
    pub fn is_row_complete(&self, y: usize) -> bool {
        self.grid.get(y).is_some_and(|row| is_row_full(row))
    }

    /// Count filled cells in a row
    pub fn filled_count_in_row(&self, y: usize) -> usize {
        self.grid
            .get(y)
            .map_or(0, |row| row.iter().filter(|cell| **cell != 0).count())
    }

    pub fn is_game_over(&self) -> bool {
        self.state == GameState::GameOver
    }

    /// Count total filled cells in grid
    pub fn total_filled_cells(&self) -> usize {
        self.grid.iter().flatten().filter(|cell| **cell != 0).count()
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Test Helpers
// ============================================================================

pub mod test_helpers {
    use super::*;

    pub fn empty_grid() -> Grid {
        vec![vec![0; GRID_WIDTH]; GRID_HEIGHT]
    }

    pub fn fill_row(grid: &mut [Vec<u8>], y: usize) {
        grid[y].fill(1);
    }

    pub fn fill_row_with_gap(grid: &mut [Vec<u8>], y: usize, gap_x: usize) {
        for x in 0..GRID_WIDTH {
            if x != gap_x {
                grid[y][x] = 1;
            }
        }
    }
}
