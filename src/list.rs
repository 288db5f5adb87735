//! Filter/sort/paginate model behind the accident table.

use std::cmp::Ordering;

use crate::models::Accident;

pub const PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Date,
    Severity,
    Vehicles,
    Casualties,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    fn flipped(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

/// Table state. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// `None` shows every severity.
    pub severity: Option<String>,
    pub sort: SortField,
    pub order: SortOrder,
    pub page: usize,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            severity: None,
            sort: SortField::Date,
            order: SortOrder::Desc,
            page: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<'a> {
    pub items: Vec<&'a Accident>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

impl ListQuery {
    /// Clicking the active column flips the order; a new column starts ascending.
    pub fn toggle_sort(&mut self, field: SortField) {
        if self.sort == field {
            self.order = self.order.flipped();
        } else {
            self.sort = field;
            self.order = SortOrder::Asc;
        }
    }

    pub fn apply<'a>(&self, accidents: &'a [Accident]) -> Page<'a> {
        let mut matching: Vec<&Accident> = accidents
            .iter()
            .filter(|a| {
                self.severity
                    .as_deref()
                    .map_or(true, |severity| a.accident_severity == severity)
            })
            .collect();

        matching.sort_by(|a, b| {
            let ordering = compare(self.sort, a, b);
            match self.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let total_items = matching.len();
        let total_pages = total_items.div_ceil(PAGE_SIZE);
        let start = self.page.saturating_sub(1).saturating_mul(PAGE_SIZE);
        let items = matching.into_iter().skip(start).take(PAGE_SIZE).collect();

        Page {
            items,
            page: self.page,
            total_pages,
            total_items,
        }
    }
}

fn compare(field: SortField, a: &Accident, b: &Accident) -> Ordering {
    match field {
        SortField::Date => a.date.cmp(&b.date),
        SortField::Severity => a.accident_severity.cmp(&b.accident_severity),
        SortField::Vehicles => a
            .number_of_vehicles
            .unwrap_or(0)
            .cmp(&b.number_of_vehicles.unwrap_or(0)),
        SortField::Casualties => a
            .number_of_casualties
            .unwrap_or(0)
            .cmp(&b.number_of_casualties.unwrap_or(0)),
    }
}
