//! Chart binder
//!
//! Builds the chart objects bound to the fixed report ranges:
//! - one line chart per target plus one for overall attainment, placed on
//!   the calculation sheet in a two-column grid to the right of the data
//! - one column chart per target over the bucket shares of the
//!   statistics sheet

use crate::layout::{self, sheet_row, DataRows, CALC_SHEET, STATS_SHEET};
use rust_xlsxwriter::{
    Chart, ChartFont, ChartFormat, ChartLine, ChartLineDashType, ChartMarker, ChartMarkerType,
    ChartType,
};

const LINE_CHART_WIDTH: u32 = 680;
const LINE_CHART_HEIGHT: u32 = 454;
/// AJ, first column right of the data block with a small gap
const LINE_CHART_COL: u16 = 35;
const LINE_CHART_ROW: u32 = 1;
const LINE_CHART_COL_GAP: u16 = 12;
const LINE_CHART_ROW_GAP: u32 = 24;

const BAR_CHART_SIZE: u32 = 378;
const BAR_CHART_ROW: u32 = 8;

const CHART_STYLE: u8 = 10;
const GRIDLINE_COLOR: u32 = 0xC0C0C0;
const AVERAGE_COLOR: u32 = 0x00FF00;
const EXPECTATION_COLOR: u32 = 0xFF0000;

/// Columns one line chart draws from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineChartSpec {
    pub title: &'static str,
    pub values: u16,
    pub average: u16,
    pub expectation: u16,
}

pub const LINE_CHARTS: [LineChartSpec; 4] = [
    LineChartSpec {
        title: "目标1达成度",
        values: layout::ATTAINMENT[0],
        average: layout::ATTAINMENT_AVERAGE[0],
        expectation: layout::EXPECTATION[0],
    },
    LineChartSpec {
        title: "目标2达成度",
        values: layout::ATTAINMENT[1],
        average: layout::ATTAINMENT_AVERAGE[1],
        expectation: layout::EXPECTATION[1],
    },
    LineChartSpec {
        title: "目标3达成度",
        values: layout::ATTAINMENT[2],
        average: layout::ATTAINMENT_AVERAGE[2],
        expectation: layout::EXPECTATION[2],
    },
    LineChartSpec {
        title: "总达成度",
        values: layout::OVERALL,
        average: layout::OVERALL_AVERAGE,
        expectation: layout::EXPECTATION[0],
    },
];

/// Statistics column and anchor column of one bar chart
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BarChartSpec {
    pub title: &'static str,
    pub values: u16,
    pub anchor_col: u16,
}

pub const BAR_CHARTS: [BarChartSpec; 3] = [
    BarChartSpec {
        title: "目标1达成度人数占比统计",
        values: layout::BUCKET_SHARE[0],
        anchor_col: 0,
    },
    BarChartSpec {
        title: "目标2达成度人数占比统计",
        values: layout::BUCKET_SHARE[1],
        anchor_col: 8,
    },
    BarChartSpec {
        title: "目标3达成度人数占比统计",
        values: layout::BUCKET_SHARE[2],
        anchor_col: 15,
    },
];

/// A chart and the zero-based cell it is inserted at
pub struct PlacedChart {
    pub row: u32,
    pub col: u16,
    pub chart: Chart,
}

/// Category label interval: about ten visible labels whatever the class size.
pub fn tick_interval(students: u32) -> u16 {
    (students / 10).clamp(1, u32::from(u16::MAX)) as u16
}

/// Zero-based anchor of the `index`-th line chart.
pub fn line_anchor(index: usize) -> (u32, u16) {
    let col = LINE_CHART_COL + (index % 2) as u16 * LINE_CHART_COL_GAP;
    let row = LINE_CHART_ROW + (index / 2) as u32 * LINE_CHART_ROW_GAP;
    (row, col)
}

fn gridline() -> ChartLine {
    let mut line = ChartLine::new();
    line.set_color(GRIDLINE_COLOR).set_width(0.75);
    line
}

fn dotted(color: u32) -> ChartLine {
    let mut line = ChartLine::new();
    line.set_color(color)
        .set_width(2.0)
        .set_dash_type(ChartLineDashType::RoundDot);
    line
}

/// Line charts for the calculation sheet.
pub fn line_charts(rows: DataRows) -> Vec<PlacedChart> {
    let first = sheet_row(rows.first());
    let last = sheet_row(rows.last());
    let header = first - 1;
    let interval = tick_interval(rows.count());

    LINE_CHARTS
        .iter()
        .enumerate()
        .map(|(index, spec)| {
            let mut chart = Chart::new(ChartType::Line);
            chart.set_style(CHART_STYLE);
            chart.title().set_name(spec.title);
            chart.legend().set_hidden();
            chart
                .x_axis()
                .set_name("学生序号")
                .set_label_interval(interval)
                .set_tick_interval(interval)
                .set_major_gridlines(true)
                .set_major_gridlines_line(&gridline());
            chart
                .y_axis()
                .set_name("达成度")
                .set_min(0.0)
                .set_max(1.0)
                .set_major_gridlines(true)
                .set_major_gridlines_line(&gridline());

            let categories = (CALC_SHEET, first, layout::SEQUENCE, last, layout::SEQUENCE);

            // Points only
            chart
                .add_series()
                .set_name((CALC_SHEET, header, spec.values))
                .set_categories(categories)
                .set_values((CALC_SHEET, first, spec.values, last, spec.values))
                .set_marker(ChartMarker::new().set_type(ChartMarkerType::Circle).set_size(5))
                .set_format(ChartFormat::new().set_no_line());

            for (col, color) in [
                (spec.average, AVERAGE_COLOR),
                (spec.expectation, EXPECTATION_COLOR),
            ] {
                chart
                    .add_series()
                    .set_name((CALC_SHEET, header, col))
                    .set_categories(categories)
                    .set_values((CALC_SHEET, first, col, last, col))
                    .set_marker(ChartMarker::new().set_none())
                    .set_format(ChartFormat::new().set_line(&dotted(color)));
            }

            chart.set_width(LINE_CHART_WIDTH).set_height(LINE_CHART_HEIGHT);
            let (row, col) = line_anchor(index);
            PlacedChart { row, col, chart }
        })
        .collect()
}

/// Column charts for the statistics sheet.
pub fn bar_charts() -> Vec<PlacedChart> {
    let first = layout::FIRST_BUCKET_ROW - 1;
    let last = first + layout::BUCKETS.len() as u32 - 1;

    BAR_CHARTS
        .iter()
        .map(|spec| {
            let mut chart = Chart::new(ChartType::Column);
            chart.set_style(CHART_STYLE);
            chart.title().set_name(spec.title);
            chart.legend().set_hidden();
            chart
                .x_axis()
                .set_font(ChartFont::new().set_size(9).set_rotation(0));
            chart
                .y_axis()
                .set_min(0.0)
                .set_max(1.0)
                .set_num_format("0%");

            chart
                .add_series()
                .set_name((STATS_SHEET, first - 1, spec.values))
                .set_categories((STATS_SHEET, first, 1, last, 1))
                .set_values((STATS_SHEET, first, spec.values, last, spec.values));

            chart.set_width(BAR_CHART_SIZE).set_height(BAR_CHART_SIZE);
            PlacedChart {
                row: BAR_CHART_ROW,
                col: spec.anchor_col,
                chart,
            }
        })
        .collect()
}
