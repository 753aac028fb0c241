//! Report rendering through Arrow record batches.

use arrow::array::{ArrayRef, Decimal128Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use arrow::util::pretty;
use retail_core::{Measure, Report};
use std::io::Write;
use std::sync::Arc;

const DECIMAL_PRECISION: u8 = 38;

/// Output format for report results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Format {
    #[default]
    Table,
    Csv,
}

/// Convert a report into a single record batch.
///
/// Key columns are strings. Counting reports get an `Int64` value column;
/// amounts become `Decimal128` at the widest scale present so no digits are
/// lost. The type follows the report kind, so an empty report keeps it.
pub fn report_to_batch(report: &Report) -> Result<RecordBatch, ArrowError> {
    let kind = report.kind;
    let mut fields = Vec::new();
    let mut columns: Vec<ArrayRef> = Vec::new();

    for (idx, name) in kind.key_columns().iter().enumerate() {
        let values: StringArray = report
            .rows
            .iter()
            .map(|row| row.keys.get(idx).map(String::as_str))
            .collect();
        fields.push(Field::new(*name, DataType::Utf8, false));
        columns.push(Arc::new(values));
    }

    if let Some(name) = kind.value_column() {
        let (field, column) = value_column(report, name)?;
        fields.push(field);
        columns.push(column);
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)
}

fn value_column(report: &Report, name: &str) -> Result<(Field, ArrayRef), ArrowError> {
    let values: Vec<Option<Measure>> = report.rows.iter().map(|row| row.value).collect();

    if report.kind.is_count() {
        let counts: Int64Array = values
            .iter()
            .map(|v| match v {
                Some(Measure::Count(n)) => Some(*n as i64),
                _ => None,
            })
            .collect();
        return Ok((Field::new(name, DataType::Int64, true), Arc::new(counts)));
    }

    let scale = values
        .iter()
        .flatten()
        .map(|m| m.as_decimal().scale())
        .max()
        .unwrap_or(0);

    let amounts = values
        .iter()
        .map(|v| {
            v.map(|m| {
                let mut amount = m.as_decimal();
                amount.rescale(scale);
                amount.mantissa()
            })
        })
        .collect::<Decimal128Array>()
        .with_precision_and_scale(DECIMAL_PRECISION, scale as i8)?;

    Ok((
        Field::new(
            name,
            DataType::Decimal128(DECIMAL_PRECISION, scale as i8),
            true,
        ),
        Arc::new(amounts),
    ))
}

/// Render a report as an ASCII table.
pub fn format_table(report: &Report) -> Result<String, ArrowError> {
    let batch = report_to_batch(report)?;
    Ok(pretty::pretty_format_batches(&[batch])?.to_string())
}

/// Write a report as CSV with a header row.
pub fn write_csv<W: Write>(report: &Report, writer: W) -> Result<(), ArrowError> {
    let batch = report_to_batch(report)?;
    let mut csv = arrow::csv::WriterBuilder::new()
        .with_header(true)
        .build(writer);
    csv.write(&batch)
}

/// Render a report in the requested format.
pub fn render(report: &Report, format: Format) -> Result<String, ArrowError> {
    match format {
        Format::Table => format_table(report),
        Format::Csv => {
            let mut buf = Vec::new();
            write_csv(report, &mut buf)?;
            String::from_utf8(buf).map_err(|e| ArrowError::ExternalError(Box::new(e)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retail_core::{ReportKind, ReportRow};
    use rust_decimal::Decimal;

    fn report(kind: ReportKind, rows: Vec<ReportRow>) -> Report {
        Report { kind, rows }
    }

    fn row(keys: &[&str], value: Option<Measure>) -> ReportRow {
        ReportRow::new(keys.iter().map(|k| k.to_string()).collect(), value)
    }

    #[test]
    fn test_amounts_use_widest_scale() {
        let report = report(
            ReportKind::CityRevenue,
            vec![
                row(&["Yangon"], Some(Measure::Amount(Decimal::new(19575675, 4)))),
                row(&["Mandalay"], Some(Measure::Amount(Decimal::new(489048, 3)))),
            ],
        );

        let batch = report_to_batch(&report).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema().field(0).name(), "city");
        assert_eq!(
            batch.schema().field(1).data_type(),
            &DataType::Decimal128(DECIMAL_PRECISION, 4)
        );

        let csv = render(&report, Format::Csv).unwrap();
        assert_eq!(
            csv,
            "city,total_revenue\nYangon,1957.5675\nMandalay,489.0480\n"
        );
    }

    #[test]
    fn test_counts_are_integers() {
        let report = report(
            ReportKind::RatingHistogram,
            vec![
                row(&["8-10"], Some(Measure::Count(3))),
                row(&["Unknown"], Some(Measure::Count(1))),
            ],
        );

        let batch = report_to_batch(&report).unwrap();
        assert_eq!(batch.schema().field(1).data_type(), &DataType::Int64);

        let table = render(&report, Format::Table).unwrap();
        assert!(table.contains("rating_bin"));
        assert!(table.contains("Unknown"));
    }

    #[test]
    fn test_listing_has_no_value_column() {
        let report = report(
            ReportKind::BranchCityList,
            vec![row(&["A", "Yangon"], None), row(&["B", "Mandalay"], None)],
        );

        let batch = report_to_batch(&report).unwrap();
        assert_eq!(batch.num_columns(), 2);
        assert_eq!(
            render(&report, Format::Csv).unwrap(),
            "branch,city\nA,Yangon\nB,Mandalay\n"
        );
    }

    #[test]
    fn test_null_average_renders_empty() {
        let report = report(
            ReportKind::AvgRatingByDay,
            vec![
                row(&["Monday"], Some(Measure::Amount(Decimal::new(745, 2)))),
                row(&["Sunday"], None),
            ],
        );

        let csv = render(&report, Format::Csv).unwrap();
        assert_eq!(csv, "day_of_week,avg_rating\nMonday,7.45\nSunday,\n");
    }

    #[test]
    fn test_empty_count_report_keeps_integer_type() {
        let report = report(ReportKind::RatingHistogram, Vec::new());
        let batch = report_to_batch(&report).unwrap();
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.schema().field(1).data_type(), &DataType::Int64);
    }

    #[test]
    fn test_empty_report() {
        let report = report(ReportKind::CategoryRevenue, Vec::new());
        let batch = report_to_batch(&report).unwrap();
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(
            render(&report, Format::Csv).unwrap(),
            "product_line,total_revenue\n"
        );
    }
}
