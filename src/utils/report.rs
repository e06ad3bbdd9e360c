use chrono::{FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rust_xlsxwriter::{Workbook, XlsxError};
use sqlx::FromRow;

pub const HEADERS: [&str; 3] = ["Employee", "Check-in Time", "Check-out Time"];
pub const COLUMN_WIDTH: f64 = 40.0;
pub const CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Attendance joined with its employee, as read for the report.
#[derive(Debug, Clone, FromRow)]
pub struct ReportRow {
    pub work_date: NaiveDate,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub checkin_time: Option<NaiveDateTime>,
    pub checkout_time: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportLine {
    pub employee: String,
    pub checkin: Option<String>,
    pub checkout: Option<String>,
}

/// One worksheet: a calendar day and its rows, possibly none.
#[derive(Debug, Clone, PartialEq)]
pub struct DaySheet {
    pub date: NaiveDate,
    pub lines: Vec<ReportLine>,
}

/// "First Last", skipping blank parts; the username stands in when both are blank.
pub fn employee_name(first_name: &str, last_name: &str, username: &str) -> String {
    let name = [first_name.trim(), last_name.trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if name.is_empty() {
        username.to_string()
    } else {
        name
    }
}

/// Renders a stored UTC timestamp in the office's local offset.
pub fn format_timestamp(utc: NaiveDateTime, offset: FixedOffset) -> String {
    Utc.from_utc_datetime(&utc)
        .with_timezone(&offset)
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

/// Buckets rows by work date, yielding one entry for every day in `[start, end]`.
pub fn group_by_day(
    start: NaiveDate,
    end: NaiveDate,
    rows: &[ReportRow],
    offset: FixedOffset,
) -> Vec<DaySheet> {
    start
        .iter_days()
        .take_while(|day| *day <= end)
        .map(|date| DaySheet {
            date,
            lines: rows
                .iter()
                .filter(|row| row.work_date == date)
                .map(|row| ReportLine {
                    employee: employee_name(&row.first_name, &row.last_name, &row.username),
                    checkin: row.checkin_time.map(|t| format_timestamp(t, offset)),
                    checkout: row.checkout_time.map(|t| format_timestamp(t, offset)),
                })
                .collect(),
        })
        .collect()
}

pub fn build_workbook(days: &[DaySheet]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();

    for day in days {
        let sheet = workbook.add_worksheet();
        sheet.set_name(day.date.format("%Y-%m-%d").to_string())?;

        // no header on a day without rows
        if day.lines.is_empty() {
            continue;
        }

        for (col, header) in HEADERS.iter().enumerate() {
            let col = col as u16;
            sheet.write_string(0, col, *header)?;
            sheet.set_column_width(col, COLUMN_WIDTH)?;
        }

        for (i, line) in day.lines.iter().enumerate() {
            let row = i as u32 + 1;
            sheet.write_string(row, 0, &line.employee)?;
            if let Some(checkin) = &line.checkin {
                sheet.write_string(row, 1, checkin)?;
            }
            if let Some(checkout) = &line.checkout {
                sheet.write_string(row, 2, checkout)?;
            }
        }
    }

    workbook.save_to_buffer()
}

pub fn file_name(start: NaiveDate, end: NaiveDate) -> String {
    format!("Attendance_Report_{start}_to_{end}.xlsx")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, d).unwrap()
    }

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        day(d).and_hms_opt(h, m, 0).unwrap()
    }

    fn row(d: u32, first: &str, last: &str, checkout: Option<NaiveDateTime>) -> ReportRow {
        ReportRow {
            work_date: day(d),
            username: "kamol".into(),
            first_name: first.into(),
            last_name: last.into(),
            checkin_time: Some(at(d, 4, 5)),
            checkout_time: checkout,
        }
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut part = archive.by_name(name).unwrap();
        let mut xml = String::new();
        part.read_to_string(&mut xml).unwrap();
        xml
    }

    #[test]
    fn name_joins_non_empty_parts() {
        assert_eq!(employee_name("Kamol", "Aliev", "kamol"), "Kamol Aliev");
        assert_eq!(employee_name("", "Aliev", "kamol"), "Aliev");
        assert_eq!(employee_name("Kamol", "  ", "kamol"), "Kamol");
        assert_eq!(employee_name("", "", "kamol"), "kamol");
    }

    #[test]
    fn timestamps_render_in_local_offset() {
        let plus_five = FixedOffset::east_opt(5 * 3600).unwrap();
        assert_eq!(format_timestamp(at(5, 4, 5), utc()), "2024-09-05 04:05:00");
        assert_eq!(format_timestamp(at(5, 4, 5), plus_five), "2024-09-05 09:05:00");
    }

    #[test]
    fn every_day_in_range_gets_a_sheet() {
        let rows = vec![row(5, "Kamol", "Aliev", None), row(7, "Diyora", "", None)];
        let days = group_by_day(day(5), day(7), &rows, utc());

        assert_eq!(
            days.iter().map(|d| d.date).collect::<Vec<_>>(),
            vec![day(5), day(6), day(7)]
        );
        assert_eq!(days[0].lines.len(), 1);
        assert!(days[1].lines.is_empty());
        assert_eq!(days[2].lines[0].employee, "Diyora");
    }

    #[test]
    fn single_day_projection() {
        let rows = vec![row(5, "Kamol", "Aliev", Some(at(5, 13, 0)))];
        let days = group_by_day(day(5), day(5), &rows, utc());

        assert_eq!(
            days,
            vec![DaySheet {
                date: day(5),
                lines: vec![ReportLine {
                    employee: "Kamol Aliev".into(),
                    checkin: Some("2024-09-05 04:05:00".into()),
                    checkout: Some("2024-09-05 13:00:00".into()),
                }],
            }]
        );
    }

    #[test]
    fn workbook_for_one_day_has_one_named_sheet() {
        let rows = vec![row(5, "Kamol", "Aliev", None)];
        let bytes = build_workbook(&group_by_day(day(5), day(5), &rows, utc())).unwrap();

        let workbook = read_part(&bytes, "xl/workbook.xml");
        assert_eq!(workbook.matches("<sheet ").count(), 1);
        assert!(workbook.contains(r#"name="2024-09-05""#));

        let strings = read_part(&bytes, "xl/sharedStrings.xml");
        for expected in ["Employee", "Check-in Time", "Check-out Time", "Kamol Aliev", "2024-09-05 04:05:00"] {
            assert!(strings.contains(expected), "missing {expected}");
        }

        let sheet = read_part(&bytes, "xl/worksheets/sheet1.xml");
        assert!(sheet.contains("<cols>"));
        assert!(sheet.contains(r#"width="40."#));
    }

    #[test]
    fn empty_day_yields_empty_sheet() {
        let rows = vec![row(5, "Kamol", "Aliev", None)];
        let bytes = build_workbook(&group_by_day(day(5), day(6), &rows, utc())).unwrap();

        let workbook = read_part(&bytes, "xl/workbook.xml");
        assert!(workbook.contains(r#"name="2024-09-06""#));

        let empty = read_part(&bytes, "xl/worksheets/sheet2.xml");
        assert!(!empty.contains("<row"));
    }

    #[test]
    fn download_name_includes_range() {
        assert_eq!(
            file_name(day(1), day(30)),
            "Attendance_Report_2024-09-01_to_2024-09-30.xlsx"
        );
    }
}
