//! Radio inputs laid out by their `rbXY` ids.

/// Position of a radio input parsed from an id such as `rb42`, together with
/// the element it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinate<E> {
    /// Row index (first digit).
    pub x: usize,
    /// Column index (second digit).
    pub y: usize,
    pub element: E,
}

/// Parse `rb<digit><digit>` into `(row, column)`. Anything else, including
/// longer ids like `rb123`, is rejected.
pub fn parse_radio_id(id: &str) -> Option<(usize, usize)> {
    let digits = id.strip_prefix("rb")?.as_bytes();
    match digits {
        [x, y] if x.is_ascii_digit() && y.is_ascii_digit() => {
            Some(((x - b'0') as usize, (y - b'0') as usize))
        }
        _ => None,
    }
}

/// A `(max_x + 1) × (max_y + 1)` grid of radio inputs, with `None` where no
/// input carried that coordinate. Rebuilt from scratch on every pass.
#[derive(Debug, Clone)]
pub struct RadioGrid<E> {
    cells: Vec<Vec<Option<E>>>,
    max_x: usize,
    max_y: usize,
}

impl<E> RadioGrid<E> {
    /// Lay out `coordinates`; `None` when there are none. A later coordinate
    /// overwrites an earlier one at the same position.
    pub fn build(coordinates: Vec<Coordinate<E>>) -> Option<Self> {
        let max_x = coordinates.iter().map(|c| c.x).max()?;
        let max_y = coordinates.iter().map(|c| c.y).max()?;

        let mut cells: Vec<Vec<Option<E>>> = (0..=max_x)
            .map(|_| (0..=max_y).map(|_| None).collect())
            .collect();
        for Coordinate { x, y, element } in coordinates {
            cells[x][y] = Some(element);
        }

        Some(Self {
            cells,
            max_x,
            max_y,
        })
    }

    pub fn max_x(&self) -> usize {
        self.max_x
    }

    pub fn max_y(&self) -> usize {
        self.max_y
    }

    pub fn rows(&self) -> usize {
        self.max_x + 1
    }

    pub fn columns(&self) -> usize {
        self.max_y + 1
    }

    /// The input at `[x][y]`, if the grid is that large and the slot is filled.
    pub fn get(&self, x: usize, y: usize) -> Option<&E> {
        self.cells.get(x)?.get(y)?.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(id: &str) -> Coordinate<String> {
        let (x, y) = parse_radio_id(id).unwrap();
        Coordinate {
            x,
            y,
            element: id.to_string(),
        }
    }

    #[test]
    fn parses_two_digit_ids_only() {
        assert_eq!(parse_radio_id("rb00"), Some((0, 0)));
        assert_eq!(parse_radio_id("rb42"), Some((4, 2)));
        assert_eq!(parse_radio_id("rb9"), None);
        assert_eq!(parse_radio_id("rb123"), None);
        assert_eq!(parse_radio_id("rbx1"), None);
        assert_eq!(parse_radio_id("xrb11"), None);
        assert_eq!(parse_radio_id("rb٤٢"), None);
    }

    #[test]
    fn grid_dimensions_follow_the_largest_indices() {
        let ids = ["rb00", "rb01", "rb10", "rb11", "rb40", "rb41", "rb42"];
        let grid = RadioGrid::build(ids.iter().map(|id| coord(id)).collect()).unwrap();

        assert_eq!((grid.max_x(), grid.max_y()), (4, 2));
        assert_eq!((grid.rows(), grid.columns()), (5, 3));
        assert_eq!(grid.get(4, 2).map(String::as_str), Some("rb42"));
        assert_eq!(grid.get(0, 2), None);
        assert_eq!(grid.get(2, 0), None);
        assert_eq!(grid.get(5, 0), None);
    }

    #[test]
    fn later_duplicates_win() {
        let mut first = coord("rb11");
        first.element = "first".into();
        let mut second = coord("rb11");
        second.element = "second".into();

        let grid = RadioGrid::build(vec![first, second]).unwrap();
        assert_eq!(grid.get(1, 1).map(String::as_str), Some("second"));
    }

    #[test]
    fn empty_input_builds_no_grid() {
        assert!(RadioGrid::<String>::build(Vec::new()).is_none());
    }
}
