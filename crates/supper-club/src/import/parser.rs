use super::ImportError;
use crate::domain::{
    CriterionId, GuestRating, InviteCode, MemberRating, RatingId, RatingRecord, RestaurantId,
    Scores, UserId,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::collections::HashMap;
use std::io::Read;

const FIXED_COLUMNS: [&str; 8] = [
    "kind",
    "id",
    "restaurant_id",
    "author",
    "handle",
    "invite",
    "comment",
    "created_at",
];

struct Layout {
    fixed: [usize; 8],
    criteria: Vec<(usize, CriterionId)>,
}

impl Layout {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, ImportError> {
        let mut fixed = [0usize; 8];
        for (slot, column) in FIXED_COLUMNS.iter().enumerate() {
            fixed[slot] = headers
                .iter()
                .position(|header| header.eq_ignore_ascii_case(column))
                .ok_or(ImportError::MissingColumn(*column))?;
        }

        let criteria = headers
            .iter()
            .enumerate()
            .filter(|(position, header)| !fixed.contains(position) && !header.is_empty())
            .map(|(position, header)| (position, CriterionId::new(header)))
            .collect();

        Ok(Self { fixed, criteria })
    }

    fn field<'r>(&self, record: &'r csv::StringRecord, slot: usize) -> Option<&'r str> {
        record
            .get(self.fixed[slot])
            .filter(|value| !value.is_empty())
    }
}

pub(crate) fn parse_ratings<R: Read>(reader: R) -> Result<Vec<RatingRecord>, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let layout = Layout::from_headers(csv_reader.headers()?)?;
    let mut records = Vec::new();
    let mut member_rows: HashMap<(UserId, RestaurantId), u64> = HashMap::new();

    for row in csv_reader.records() {
        let row = row?;
        let line = row.position().map(|position| position.line()).unwrap_or_default();
        let record = parse_row(&layout, &row).map_err(|reason| ImportError::Row { line, reason })?;

        if let Some(author) = record.member() {
            let key = (author.clone(), record.restaurant_id().clone());
            if let Some(first) = member_rows.insert(key, line) {
                return Err(ImportError::Row {
                    line,
                    reason: format!(
                        "member {author} already rated {} on line {first}",
                        record.restaurant_id()
                    ),
                });
            }
        }
        records.push(record);
    }

    Ok(records)
}

fn parse_row(layout: &Layout, row: &csv::StringRecord) -> Result<RatingRecord, String> {
    let required = |slot: usize| {
        layout
            .field(row, slot)
            .ok_or_else(|| format!("'{}' is required", FIXED_COLUMNS[slot]))
    };

    let restaurant_id = RestaurantId::new(required(2)?);
    let created_at = parse_timestamp(required(7)?)?;
    let comment = layout.field(row, 6).map(str::to_string);
    let scores = parse_scores(layout, row)?;
    if scores.is_empty() {
        return Err("a rating must score at least one criterion".to_string());
    }

    match required(0)?.to_ascii_lowercase().as_str() {
        "member" => Ok(RatingRecord::Member(MemberRating {
            id: RatingId::new(required(1)?),
            restaurant_id,
            author: UserId::new(required(3)?),
            scores,
            comment,
            created_at,
        })),
        "guest" => {
            let invite = InviteCode::new(required(5)?);
            let id = layout
                .field(row, 1)
                .map(RatingId::new)
                .unwrap_or_else(|| RatingId::for_invite(&invite));
            Ok(RatingRecord::Guest(GuestRating {
                id,
                restaurant_id,
                invite,
                author_name: required(3)?.to_string(),
                author_handle: layout.field(row, 4).map(str::to_string),
                scores,
                comment,
                created_at,
            }))
        }
        other => Err(format!("unknown rating kind '{other}'")),
    }
}

fn parse_scores(layout: &Layout, row: &csv::StringRecord) -> Result<Scores, String> {
    let mut scores = Scores::new();
    for (position, criterion) in &layout.criteria {
        let Some(raw) = row.get(*position).filter(|value| !value.is_empty()) else {
            continue;
        };
        let value = raw
            .replace(',', ".")
            .parse::<f64>()
            .ok()
            .filter(|value: &f64| value.is_finite())
            .ok_or_else(|| format!("score '{raw}' for '{criterion}' is not a number"))?;
        scores.insert(criterion.clone(), value);
    }
    Ok(scores)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(timestamp.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| format!("'{raw}' is neither RFC 3339 nor YYYY-MM-DD"))
}
