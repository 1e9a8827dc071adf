use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

pub const SEATS_PER_ROW: usize = 4;
const SEAT_LETTERS: [char; SEATS_PER_ROW] = ['A', 'B', 'C', 'D'];

/// One seat on a bus. `is_selected` only has meaning inside a checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Seat {
    pub id: String,
    pub number: String,
    pub is_booked: bool,
    #[serde(default)]
    pub is_selected: bool,
}

pub fn seat_id(bus_id: Uuid, number: &str) -> String {
    format!("{}-{}", bus_id, number)
}

/// Seat numbers for a bus of `total_seats`, row by row ("1A", "1B", ... "2A", ...).
pub fn seat_numbers(total_seats: usize) -> Vec<String> {
    (0..total_seats)
        .map(|i| format!("{}{}", i / SEATS_PER_ROW + 1, SEAT_LETTERS[i % SEATS_PER_ROW]))
        .collect()
}

/// Row part of a seat number: "12C" -> "12".
pub fn row_of(number: &str) -> &str {
    let cut = number.char_indices().last().map_or(0, |(i, _)| i);
    &number[..cut]
}

pub fn total_price(seat_count: usize, price_per_seat: i64) -> i64 {
    seat_count as i64 * price_per_seat
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleOutcome {
    Selected,
    Deselected,
    /// The seat is booked; nothing changed.
    Unavailable,
}

/// Seat inventory of a single bus.
#[derive(Debug, Clone, Serialize)]
pub struct SeatMap {
    pub bus_id: Uuid,
    pub seats: Vec<Seat>,
}

impl SeatMap {
    /// Generate the seats for a bus, marking the given seat numbers as booked.
    pub fn generate(bus_id: Uuid, total_seats: usize, booked: &HashSet<String>) -> Self {
        let seats = seat_numbers(total_seats)
            .into_iter()
            .map(|number| Seat {
                id: seat_id(bus_id, &number),
                is_booked: booked.contains(&number),
                is_selected: false,
                number,
            })
            .collect();

        Self { bus_id, seats }
    }

    pub fn get(&self, number: &str) -> Option<&Seat> {
        self.seats.iter().find(|s| s.number == number)
    }

    fn get_mut(&mut self, number: &str) -> Result<&mut Seat, InventoryError> {
        self.seats
            .iter_mut()
            .find(|s| s.number == number)
            .ok_or_else(|| InventoryError::SeatNotFound(number.to_string()))
    }

    pub fn toggle(&mut self, number: &str) -> Result<ToggleOutcome, InventoryError> {
        let seat = self.get_mut(number)?;

        if seat.is_booked {
            return Ok(ToggleOutcome::Unavailable);
        }

        seat.is_selected = !seat.is_selected;
        Ok(if seat.is_selected {
            ToggleOutcome::Selected
        } else {
            ToggleOutcome::Deselected
        })
    }

    /// Restore a selection carried over from an earlier request.
    ///
    /// Seats booked in the meantime are dropped silently; unknown numbers are an error.
    pub fn restore_selection(&mut self, numbers: &[String]) -> Result<(), InventoryError> {
        for number in numbers {
            let seat = self.get_mut(number)?;
            seat.is_selected = !seat.is_booked;
        }
        Ok(())
    }

    pub fn selected(&self) -> Vec<&Seat> {
        self.seats.iter().filter(|s| s.is_selected).collect()
    }

    /// Selected seat numbers in seat-map order.
    pub fn selected_numbers(&self) -> Vec<String> {
        self.selected().into_iter().map(|s| s.number.clone()).collect()
    }

    pub fn total_price(&self, price_per_seat: i64) -> i64 {
        total_price(self.selected().len(), price_per_seat)
    }

    /// Mark seats as booked and clear the selection.
    ///
    /// All-or-nothing: if any seat is unknown or already booked, nothing changes.
    pub fn book(&mut self, numbers: &[String]) -> Result<(), InventoryError> {
        let mut taken = Vec::new();
        for number in numbers {
            let seat = self
                .get(number)
                .ok_or_else(|| InventoryError::SeatNotFound(number.to_string()))?;
            if seat.is_booked {
                taken.push(number.clone());
            }
        }
        if !taken.is_empty() {
            return Err(InventoryError::AlreadyBooked(taken));
        }

        for seat in &mut self.seats {
            if numbers.contains(&seat.number) {
                seat.is_booked = true;
            }
            seat.is_selected = false;
        }
        Ok(())
    }

    /// Free the given seats again (cancelled or rejected booking).
    pub fn release(&mut self, numbers: &[String]) {
        for seat in &mut self.seats {
            if numbers.contains(&seat.number) {
                seat.is_booked = false;
            }
        }
    }

    pub fn available_count(&self) -> usize {
        self.seats.iter().filter(|s| !s.is_booked).count()
    }

    pub fn booked_numbers(&self) -> HashSet<String> {
        self.seats
            .iter()
            .filter(|s| s.is_booked)
            .map(|s| s.number.clone())
            .collect()
    }

    /// Seats grouped by numeric row, for rendering a seat grid.
    pub fn rows(&self) -> BTreeMap<u32, Vec<&Seat>> {
        let mut rows: BTreeMap<u32, Vec<&Seat>> = BTreeMap::new();
        for seat in &self.seats {
            let row = row_of(&seat.number).parse().unwrap_or_default();
            rows.entry(row).or_default().push(seat);
        }
        rows
    }

    /// "1A, 1B" or "None".
    pub fn format_selected(&self) -> String {
        let selected = self.selected_numbers();
        if selected.is_empty() {
            "None".to_string()
        } else {
            selected.join(", ")
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InventoryError {
    #[error("Seat not found: {0}")]
    SeatNotFound(String),

    #[error("Seats already booked: {}", .0.join(", "))]
    AlreadyBooked(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seat_map(total: usize) -> SeatMap {
        SeatMap::generate(Uuid::new_v4(), total, &HashSet::new())
    }

    #[test]
    fn test_seats_are_laid_out_in_rows_of_four() {
        let map = seat_map(10);
        let numbers: Vec<&str> = map.seats.iter().map(|s| s.number.as_str()).collect();
        assert_eq!(
            numbers,
            vec!["1A", "1B", "1C", "1D", "2A", "2B", "2C", "2D", "3A", "3B"]
        );

        let rows = map.rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[&3].len(), 2);
    }

    #[test]
    fn test_seat_id_is_derived_from_bus_and_number() {
        let bus_id = Uuid::new_v4();
        let map = SeatMap::generate(bus_id, 4, &HashSet::new());
        assert_eq!(map.seats[2].id, format!("{}-1C", bus_id));
    }

    #[test]
    fn test_row_of_handles_two_digit_rows() {
        assert_eq!(row_of("3B"), "3");
        assert_eq!(row_of("12D"), "12");
        assert_eq!(row_of(""), "");
    }

    #[test]
    fn test_toggle_flips_selection() {
        let mut map = seat_map(8);

        assert_eq!(map.toggle("1A").unwrap(), ToggleOutcome::Selected);
        assert!(map.get("1A").unwrap().is_selected);

        assert_eq!(map.toggle("1A").unwrap(), ToggleOutcome::Deselected);
        assert!(!map.get("1A").unwrap().is_selected);
    }

    #[test]
    fn test_toggling_booked_seat_is_noop() {
        let booked: HashSet<String> = ["2C".to_string()].into_iter().collect();
        let mut map = SeatMap::generate(Uuid::new_v4(), 8, &booked);

        assert_eq!(map.toggle("2C").unwrap(), ToggleOutcome::Unavailable);
        let seat = map.get("2C").unwrap();
        assert!(seat.is_booked);
        assert!(!seat.is_selected);
    }

    #[test]
    fn test_toggle_unknown_seat() {
        let mut map = seat_map(4);
        assert_eq!(
            map.toggle("9Z").unwrap_err(),
            InventoryError::SeatNotFound("9Z".to_string())
        );
    }

    #[test]
    fn test_total_is_seat_count_times_price() {
        let mut map = seat_map(12);
        assert_eq!(map.total_price(5000), 0);

        map.toggle("1A").unwrap();
        map.toggle("1B").unwrap();
        assert_eq!(map.total_price(5000), 10000);

        map.toggle("3D").unwrap();
        assert_eq!(map.total_price(5000), map.selected().len() as i64 * 5000);
    }

    #[test]
    fn test_book_marks_seats_and_clears_selection() {
        let mut map = seat_map(8);
        map.toggle("1A").unwrap();
        map.toggle("1B").unwrap();
        map.toggle("2A").unwrap();

        let chosen = vec!["1A".to_string(), "1B".to_string()];
        map.book(&chosen).unwrap();

        assert!(map.get("1A").unwrap().is_booked);
        assert!(map.get("1B").unwrap().is_booked);
        assert!(map.selected().is_empty());
        assert_eq!(map.available_count(), 6);
        assert_eq!(map.format_selected(), "None");
    }

    #[test]
    fn test_book_is_all_or_nothing() {
        let booked: HashSet<String> = ["1B".to_string()].into_iter().collect();
        let mut map = SeatMap::generate(Uuid::new_v4(), 8, &booked);

        let err = map.book(&["1A".to_string(), "1B".to_string()]).unwrap_err();
        assert_eq!(err, InventoryError::AlreadyBooked(vec!["1B".to_string()]));
        assert!(!map.get("1A").unwrap().is_booked);
    }

    #[test]
    fn test_release_frees_seats() {
        let mut map = seat_map(4);
        let chosen = vec!["1C".to_string()];
        map.book(&chosen).unwrap();
        map.release(&chosen);
        assert_eq!(map.available_count(), 4);
    }

    #[test]
    fn test_restore_selection_skips_booked_seats() {
        let booked: HashSet<String> = ["1B".to_string()].into_iter().collect();
        let mut map = SeatMap::generate(Uuid::new_v4(), 8, &booked);

        map.restore_selection(&["1A".to_string(), "1B".to_string()]).unwrap();
        assert_eq!(map.selected_numbers(), vec!["1A".to_string()]);
        assert_eq!(map.format_selected(), "1A");
    }
}
