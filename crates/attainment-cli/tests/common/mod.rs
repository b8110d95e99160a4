//! Shared helpers for CLI integration tests

use rust_xlsxwriter::{Workbook, XlsxError};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

pub fn attainment_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_attainment"))
}

/// Run the binary with `args` and collect its output
pub fn run(args: &[&str]) -> Output {
    Command::new(attainment_binary())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to execute attainment")
}

/// Write a one-sheet gradebook with two graded students and one absentee
pub fn write_gradebook(dir: &Path, file_name: &str, class: &str) -> Result<PathBuf, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("成绩")?;
    worksheet.write_string(0, 0, format!("行政班：{}", class))?;
    for (col, header) in ["学号", "姓名", "平时成绩", "期末成绩", "总成绩"]
        .iter()
        .enumerate()
    {
        worksheet.write_string(1, col as u16, *header)?;
    }
    let rows: [(&str, &str, [Option<f64>; 3]); 2] = [
        ("2023001002", "李四", [Some(70.0), Some(60.0), Some(63.0)]),
        ("2023001001", "张三", [Some(80.0), Some(90.0), Some(87.0)]),
    ];
    for (offset, (id, name, scores)) in rows.iter().enumerate() {
        let row = 2 + offset as u32;
        worksheet.write_string(row, 0, *id)?;
        worksheet.write_string(row, 1, *name)?;
        for (col, score) in scores.iter().enumerate() {
            if let Some(score) = score {
                worksheet.write_number(row, 2 + col as u16, *score)?;
            }
        }
    }
    worksheet.write_string(4, 0, "2023001003")?;
    worksheet.write_string(4, 1, "王五")?;
    worksheet.write_string(4, 3, "缺考")?;

    let path = dir.join(file_name);
    workbook.save(&path)?;
    Ok(path)
}

/// Write a workbook with no recognizable header
pub fn write_empty_workbook(dir: &Path, file_name: &str) -> Result<PathBuf, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("说明")?;
    worksheet.write_string(0, 0, "本表无成绩数据")?;
    let path = dir.join(file_name);
    workbook.save(&path)?;
    Ok(path)
}

pub fn path_str(path: &Path) -> &str {
    path.to_str().expect("temp paths are UTF-8")
}
