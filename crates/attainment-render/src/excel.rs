//! Attainment workbook synthesizer
//!
//! Generates the XLSX report with two sheets in fixed order:
//! - 课程目标达成度计算: one row per student with live formulas, a trailing
//!   averages row and four line charts
//! - 达成度统计: the five-bucket attainment table with three column charts
//!
//! Every derived value is a formula string; the spreadsheet application
//! computes it on open.
//!
//! ## Example Output Structure
//!
//! ```text
//! Sheet: 课程目标达成度计算
//! |      |        | 50     | 30     | 20     |      成绩     | ... |  M1:N1 = 30  | ... |
//! | 班级 | 学号   | 目标一 | 目标二 | 目标三 | 平时 | 期末 | 总分 | ... | 达成度 ...
//! | A    | 20231  | =ROUND(H3*$C$1/100,0) ... | 80 | 90 | 87 | ... | =S3/100 ...
//! | （平均值）    | =AVERAGE(C3:C3) ...
//! ```

use crate::charts::{self, PlacedChart};
use crate::layout::{self, sheet_row, DataRows, BUCKETS, CALC_SHEET, STATS_SHEET};
use crate::plan::{self, CellValue, PlannedCell, Style};
use attainment_core::{
    AttainmentConfig, Checkpoint, NoProgress, Progress, RenderError, Renderer, StudentRecord,
    TARGET_COUNT,
};
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};
use tracing::debug;

fn format_err(e: XlsxError) -> RenderError {
    RenderError::Format(e.to_string())
}

/// Excel attainment report renderer
#[derive(Clone, Debug, Default)]
pub struct AttainmentWorkbook {
    config: AttainmentConfig,
    /// Whether to attach line and column charts
    pub include_charts: bool,
}

impl AttainmentWorkbook {
    pub fn new(config: AttainmentConfig) -> Self {
        Self {
            config,
            include_charts: true,
        }
    }

    /// Leave the charts out (formulas and tables only)
    pub fn no_charts(mut self) -> Self {
        self.include_charts = false;
        self
    }

    /// Generate workbook bytes, reporting checkpoints to `progress`.
    ///
    /// Records are written in the order given; sort them first.
    pub fn render_with_progress(
        &self,
        records: &[StudentRecord],
        progress: &mut dyn Progress,
    ) -> Result<Vec<u8>, RenderError> {
        if records.is_empty() {
            return Err(RenderError::InvalidData(
                "no student records to write".into(),
            ));
        }
        self.config
            .validate()
            .map_err(|e| RenderError::InvalidData(e.to_string()))?;

        let rows = DataRows::new(records.len());
        let formats = create_formats();

        let mut calc = Worksheet::new();
        calc.set_name(CALC_SHEET).map_err(format_err)?;
        self.write_headers(&mut calc, &formats)?;
        progress.report(&Checkpoint::HeadersWritten);

        let planned: Vec<(u32, Vec<PlannedCell>)> = records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let cells = plan::plan_row(record, index, rows, &self.config);
                (sheet_row(rows.row_of(index)), cells)
            })
            .collect();

        for (row, cells) in &planned {
            write_row(&mut calc, *row, cells.iter().filter(|c| !c.is_formula()), &formats)?;
        }
        progress.report(&Checkpoint::DataWritten);

        for (row, cells) in &planned {
            write_row(&mut calc, *row, cells.iter().filter(|c| c.is_formula()), &formats)?;
        }
        progress.report(&Checkpoint::Computed);

        write_averages(&mut calc, rows, &formats)?;
        set_column_widths(&mut calc)?;
        progress.report(&Checkpoint::Averaged);

        let mut stats = Worksheet::new();
        stats.set_name(STATS_SHEET).map_err(format_err)?;
        write_statistics(&mut stats, rows, &formats)?;
        progress.report(&Checkpoint::StatisticsBuilt);

        if self.include_charts {
            insert_charts(&mut calc, charts::line_charts(rows))?;
            insert_charts(&mut stats, charts::bar_charts())?;
        }
        progress.report(&Checkpoint::ChartsBuilt);

        let mut workbook = Workbook::new();
        workbook.push_worksheet(calc);
        workbook.push_worksheet(stats);

        let buffer = workbook
            .save_to_buffer()
            .map_err(|e| RenderError::Format(format!("Failed to create Excel: {e}")))?;
        debug!(
            students = records.len(),
            bytes = buffer.len(),
            "attainment workbook rendered"
        );
        Ok(buffer)
    }

    /// Rows 1 and 2 of the calculation sheet
    fn write_headers(&self, sheet: &mut Worksheet, formats: &ExcelFormats) -> Result<(), RenderError> {
        for (first, last) in layout::EMPTY_SPANS {
            sheet
                .merge_range(0, first, 0, last, "", &formats.plain)
                .map_err(format_err)?;
        }

        for (target, weight) in self.config.target_weights.iter().enumerate() {
            sheet
                .write_number_with_format(0, layout::TARGET_SHARE[target], *weight, &formats.plain)
                .map_err(format_err)?;
        }

        let score_weights = [
            self.config.score_weights.regular,
            self.config.score_weights.final_exam,
        ];
        for ((first, last), weight) in layout::WEIGHT_SPANS.into_iter().zip(score_weights) {
            sheet
                .merge_range(0, first, 0, last, "", &formats.plain)
                .map_err(format_err)?;
            sheet
                .write_number_with_format(0, first, weight, &formats.plain)
                .map_err(format_err)?;
        }

        for (first, last, title) in layout::TITLE_SPANS {
            if first == last {
                sheet
                    .write_string_with_format(0, first, title, &formats.header)
                    .map_err(format_err)?;
            } else {
                sheet
                    .merge_range(0, first, 0, last, title, &formats.header)
                    .map_err(format_err)?;
            }
        }
        sheet
            .merge_range(
                0,
                layout::OVERALL_AVERAGE,
                1,
                layout::OVERALL_AVERAGE,
                layout::OVERALL_AVERAGE_TITLE,
                &formats.header,
            )
            .map_err(format_err)?;

        for (col, label) in layout::COLUMN_LABELS.iter().enumerate() {
            sheet
                .write_string_with_format(1, col as u16, *label, &formats.header)
                .map_err(format_err)?;
        }
        Ok(())
    }
}

impl Renderer for AttainmentWorkbook {
    type Output = Vec<u8>;

    fn render(&self, records: &[StudentRecord]) -> Result<Vec<u8>, RenderError> {
        self.render_with_progress(records, &mut NoProgress)
    }
}

fn write_row<'a>(
    sheet: &mut Worksheet,
    row: u32,
    cells: impl IntoIterator<Item = &'a PlannedCell>,
    formats: &ExcelFormats,
) -> Result<(), RenderError> {
    for cell in cells {
        let format = match cell.style {
            Style::Plain => &formats.plain,
            Style::Decimal => &formats.decimal,
        };
        match &cell.value {
            CellValue::Text(text) => sheet.write_string_with_format(row, cell.col, text, format),
            CellValue::Number(value) => {
                sheet.write_number_with_format(row, cell.col, *value, format)
            }
            CellValue::Formula(formula) => {
                sheet.write_formula_with_format(row, cell.col, formula.as_str(), format)
            }
            CellValue::Blank => sheet.write_blank(row, cell.col, format),
        }
        .map_err(format_err)?;
    }
    Ok(())
}

fn write_averages(
    sheet: &mut Worksheet,
    rows: DataRows,
    formats: &ExcelFormats,
) -> Result<(), RenderError> {
    let row = sheet_row(rows.averages());
    sheet
        .merge_range(
            row,
            layout::CLASS,
            row,
            layout::STUDENT_ID,
            layout::AVERAGES_LABEL,
            &formats.plain,
        )
        .map_err(format_err)?;

    for col in layout::averaged_columns() {
        let formula = layout::column_average(col, rows);
        sheet
            .write_formula_with_format(row, col, formula.as_str(), &formats.average)
            .map_err(format_err)?;
    }
    Ok(())
}

fn set_column_widths(sheet: &mut Worksheet) -> Result<(), RenderError> {
    const NUMERIC_WIDTH: f64 = 11.0;

    for col in (layout::TARGET_SHARE[0]..=layout::TOTAL)
        .chain(layout::REGULAR_BY_TARGET[0]..=layout::EXPECTATION[2])
    {
        sheet.set_column_width(col, NUMERIC_WIDTH).map_err(format_err)?;
    }
    for (col, width) in [
        (layout::OVERALL, NUMERIC_WIDTH + 2.0),
        (layout::OVERALL_AVERAGE, 16.5),
        (layout::CLASS, 13.0),
        (layout::STUDENT_ID, 13.0),
        (layout::NAME, 9.0),
        (layout::SEQUENCE, 6.0),
    ] {
        sheet.set_column_width(col, width).map_err(format_err)?;
    }
    Ok(())
}

/// Second sheet: bucket counts and shares per target
fn write_statistics(
    sheet: &mut Worksheet,
    rows: DataRows,
    formats: &ExcelFormats,
) -> Result<(), RenderError> {
    sheet
        .write_string_with_format(0, 0, "达成度", &formats.header)
        .map_err(format_err)?;
    sheet
        .write_string_with_format(0, 1, "达成情况", &formats.header)
        .map_err(format_err)?;
    sheet.write_blank(1, 0, &formats.plain).map_err(format_err)?;
    sheet.write_blank(1, 1, &formats.plain).map_err(format_err)?;

    for target in 0..TARGET_COUNT {
        let count_col = layout::BUCKET_COUNT[target];
        let share_col = layout::BUCKET_SHARE[target];
        sheet
            .merge_range(
                0,
                count_col,
                0,
                share_col,
                &format!("目标{}", target + 1),
                &formats.header,
            )
            .map_err(format_err)?;
        sheet
            .write_string_with_format(1, count_col, "人数", &formats.header)
            .map_err(format_err)?;
        sheet
            .write_string_with_format(1, share_col, "占比", &formats.header)
            .map_err(format_err)?;
    }

    for (offset, bucket) in BUCKETS.iter().enumerate() {
        let bucket_row = layout::FIRST_BUCKET_ROW + offset as u32;
        let row = sheet_row(bucket_row);
        sheet
            .write_string_with_format(row, 0, bucket.range_label, &formats.plain)
            .map_err(format_err)?;
        sheet
            .write_string_with_format(row, 1, bucket.description, &formats.plain)
            .map_err(format_err)?;

        for target in 0..TARGET_COUNT {
            let count = bucket.count_formula(target, rows);
            let share = layout::share_formula(target, bucket_row, rows);
            sheet
                .write_formula_with_format(
                    row,
                    layout::BUCKET_COUNT[target],
                    count.as_str(),
                    &formats.plain,
                )
                .map_err(format_err)?;
            sheet
                .write_formula_with_format(
                    row,
                    layout::BUCKET_SHARE[target],
                    share.as_str(),
                    &formats.percent,
                )
                .map_err(format_err)?;
        }
    }

    sheet.set_column_width(0, 11).map_err(format_err)?;
    sheet.set_column_width(1, 11).map_err(format_err)?;
    for col in layout::BUCKET_COUNT[0]..=layout::BUCKET_SHARE[2] {
        sheet.set_column_width(col, 7).map_err(format_err)?;
    }
    Ok(())
}

fn insert_charts(sheet: &mut Worksheet, charts: Vec<PlacedChart>) -> Result<(), RenderError> {
    for placed in charts {
        sheet
            .insert_chart(placed.row, placed.col, &placed.chart)
            .map_err(format_err)?;
    }
    Ok(())
}

/// Create reusable formats
fn create_formats() -> ExcelFormats {
    let plain = Format::new()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin);

    let header = plain.clone().set_bold();

    let decimal = plain.clone().set_num_format("0.00");

    let average = Format::new()
        .set_align(FormatAlign::Right)
        .set_align(FormatAlign::VerticalCenter)
        .set_num_format("0.00")
        .set_border(FormatBorder::Thin);

    let percent = plain.clone().set_num_format("0.00%");

    ExcelFormats {
        header,
        plain,
        decimal,
        average,
        percent,
    }
}

/// Excel formats used in the report
struct ExcelFormats {
    header: Format,
    plain: Format,
    decimal: Format,
    average: Format,
    percent: Format,
}
