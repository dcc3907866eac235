//! Terminal rendering of grid snapshots.

use gridlab_core::cell_codec::{decode_cell, CellState, CellStyle};
use gridlab_core::{ComponentLabel, Ingredient, SimulationConfig};
use std::fmt::Write;

/// How cells are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// One glyph per cell
    #[default]
    Plain,
    /// Glyphs on 24-bit ANSI backgrounds taken from the cell style
    Ansi,
}

/// Glyph for one decoded cell.
pub fn cell_glyph(state: &CellState) -> char {
    match state {
        CellState::Empty => '.',
        CellState::Component { component_index } => ComponentLabel::from_index(*component_index)
            .map(|label| label.letter())
            .unwrap_or('?'),
        CellState::Directional { direction } => direction.glyph(),
        CellState::Intermediate => '*',
        CellState::Unknown => '?',
    }
}

fn paint(out: &mut String, value: i64, components: &[Ingredient], mode: RenderMode) {
    let state = decode_cell(value, components);
    let glyph = cell_glyph(&state);
    match mode {
        RenderMode::Plain => out.push(glyph),
        RenderMode::Ansi => {
            let style = CellStyle::for_state(&state, components);
            let fg = style.arrow.map(|a| a.color).unwrap_or(gridlab_core::Rgb(0, 0, 0));
            let _ = write!(
                out,
                "\x1b[48;2;{};{};{}m\x1b[38;2;{};{};{}m{}\x1b[0m",
                style.fill.0, style.fill.1, style.fill.2, fg.0, fg.1, fg.2, glyph
            );
        }
    }
}

/// Renders one snapshot, a line per row.
pub fn render_snapshot(snapshot: &[Vec<i64>], components: &[Ingredient], mode: RenderMode) -> String {
    let mut out = String::new();
    for row in snapshot {
        for &value in row {
            paint(&mut out, value, components, mode);
        }
        out.push('\n');
    }
    out
}

/// Legend: one line per component plus the special states.
pub fn render_legend(config: &SimulationConfig) -> String {
    let mut out = String::new();
    let rotating = config.rotating_component();
    for (index, ingredient) in config.ingredients.iter().enumerate() {
        let Some(label) = ComponentLabel::from_index(index) else {
            break;
        };
        let style = CellStyle::for_state(&CellState::Component { component_index: index }, &config.ingredients);
        let _ = write!(
            out,
            "{}  {:<16} {:>6.2}%  {}",
            label, ingredient.name, ingredient.molar_fraction, style.fill
        );
        if rotating == Some(label) {
            out.push_str("  (rotating: ↑ ← ↓ →)");
        }
        out.push('\n');
    }
    out.push_str(".  empty\n*  intermediate\n?  unknown\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridlab_core::Direction;
    use proptest::prelude::*;

    fn inventory() -> Vec<Ingredient> {
        vec![
            Ingredient::new("water", "blue", 70.0),
            Ingredient::new("oil", "yellow", 30.0),
        ]
    }

    #[test]
    fn test_glyphs() {
        assert_eq!(cell_glyph(&CellState::Empty), '.');
        assert_eq!(cell_glyph(&CellState::Component { component_index: 1 }), 'B');
        assert_eq!(cell_glyph(&CellState::Directional { direction: Direction::Left }), '←');
        assert_eq!(cell_glyph(&CellState::Intermediate), '*');
        assert_eq!(cell_glyph(&CellState::Unknown), '?');
    }

    #[test]
    fn test_plain_snapshot() {
        let snapshot = vec![vec![0, 1, 2], vec![13, 250, 9]];
        let text = render_snapshot(&snapshot, &inventory(), RenderMode::Plain);
        assert_eq!(text, ".AB\n↑*?\n");
    }

    #[test]
    fn test_ansi_uses_cell_fill() {
        let text = render_snapshot(&[vec![1]], &inventory(), RenderMode::Ansi);
        // blue = #3b82f6
        assert!(text.starts_with("\x1b[48;2;59;130;246m"));
        assert!(text.contains('A'));
    }

    #[test]
    fn test_legend() {
        let config = SimulationConfig {
            ingredients: inventory(),
            ..Default::default()
        };
        let legend = render_legend(&config);
        let first = legend.lines().next().unwrap();
        assert!(first.starts_with("A  water"));
        assert!(first.ends_with("#3b82f6"));
        assert!(legend.contains("*  intermediate"));
    }

    proptest! {
        #[test]
        fn prop_plain_render_keeps_shape(rows in 1usize..8, cols in 1usize..8, fill in -3i64..400) {
            let snapshot = vec![vec![fill; cols]; rows];
            let text = render_snapshot(&snapshot, &inventory(), RenderMode::Plain);
            prop_assert_eq!(text.lines().count(), rows);
            prop_assert!(text.lines().all(|line| line.chars().count() == cols));
        }
    }
}
