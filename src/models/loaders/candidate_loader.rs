//! 候选列表加载
//!
//! 输入是逐行的 CSV：可以带表头（按列名取值），也可以不带（按位置取
//! `source_id, healpix_id, ra, dec, reason`）。空行与 `#` 注释行被忽略。

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{info, warn};

use crate::error::{ObservabilityError, SetupError};
use crate::models::candidate::Candidate;

const POSITIONAL_COLUMNS: [&str; 5] = ["source_id", "healpix_id", "ra", "dec", "reason"];

/// 已加载的候选文件
#[derive(Debug, Clone)]
pub struct CandidateSource {
    path: PathBuf,
    identity: String,
    header: Option<String>,
    candidates: Vec<Candidate>,
}

impl CandidateSource {
    /// 读取并解析候选文件
    ///
    /// 文件不存在或无法解析都是启动错误
    pub async fn open(path: &Path) -> Result<Self, SetupError> {
        if !path.exists() {
            return Err(SetupError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|source| SetupError::InputUnreadable {
                path: path.to_path_buf(),
                source,
            })?;

        let (header, candidates) = parse_candidates(&content)?;
        info!(
            "✓ 已加载候选文件 {}: {} 个候选",
            path.file_name().unwrap_or_default().to_string_lossy(),
            candidates.len()
        );

        let identity = std::fs::canonicalize(path)
            .unwrap_or_else(|_| path.to_path_buf())
            .to_string_lossy()
            .to_string();

        Ok(Self {
            path: path.to_path_buf(),
            identity,
            header,
            candidates,
        })
    }

    /// 输入标识，断点据此判断是否属于本次输入
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// 结果文件路径：候选文件旁的 `<stem>_results.json`
    pub fn result_path(&self) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy();
        self.path.with_file_name(format!("{}_results.json", stem))
    }

    /// 把候选文件重置为只剩表头（无表头时清空）
    pub async fn reset(&self) -> Result<(), ObservabilityError> {
        let content = match &self.header {
            Some(header) => format!("{}\n", header),
            None => String::new(),
        };
        fs::write(&self.path, content)
            .await
            .map_err(|e| ObservabilityError::io(&self.path, e))
    }
}

/// 解析候选文件内容，返回 (表头, 候选列表)
///
/// 重复的 source_id 只保留第一次出现
pub fn parse_candidates(content: &str) -> Result<(Option<String>, Vec<Candidate>), SetupError> {
    let mut header = None;
    let mut columns: Option<HashMap<String, usize>> = None;
    let mut candidates = Vec::new();
    let mut seen = HashSet::new();

    for record in read_records(content) {
        let line_no = record.line;
        let fields = record.fields;

        if columns.is_none() {
            if fields.first().is_some_and(|f| f.parse::<u64>().is_ok()) {
                columns = Some(positional_columns());
            } else {
                let mapping = header_columns(&fields);
                if !mapping.contains_key("source_id") {
                    return Err(SetupError::InputParse {
                        line: line_no,
                        reason: "表头缺少 source_id 列".to_string(),
                    });
                }
                header = Some(record.raw);
                columns = Some(mapping);
                continue;
            }
        }

        let Some(mapping) = columns.as_ref() else {
            continue;
        };
        let candidate = parse_row(&fields, mapping, line_no)?;
        if !seen.insert(candidate.source_id) {
            warn!("第 {} 行: 重复的 source_id {}，已忽略", line_no, candidate.source_id);
            continue;
        }
        candidates.push(candidate);
    }

    Ok((header, candidates))
}

/// 一条 CSV 记录
struct Record {
    /// 记录起始行号（从1开始）
    line: usize,
    /// 原始文本，表头据此原样写回
    raw: String,
    fields: Vec<String>,
}

/// 按 RFC 4180 切分记录
///
/// 引号内的逗号与换行属于字段本身，`""` 表示一个引号；
/// 开头的 UTF-8 BOM 被去掉；空行与 `#` 开头的注释行不产生记录
fn read_records(content: &str) -> Vec<Record> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut raw = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut start_line = 1;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            raw.push(c);
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    raw.push('"');
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => {
                    if c == '\n' {
                        line += 1;
                    }
                    field.push(c);
                }
            }
            continue;
        }

        match c {
            '#' if fields.is_empty() && raw.trim().is_empty() => {
                while chars.peek().is_some_and(|&n| n != '\n') {
                    chars.next();
                }
            }
            '"' => {
                raw.push(c);
                in_quotes = true;
            }
            ',' => {
                raw.push(c);
                fields.push(take_field(&mut field));
            }
            '\r' => {}
            '\n' => {
                fields.push(take_field(&mut field));
                push_record(&mut records, start_line, &mut raw, &mut fields);
                line += 1;
                start_line = line;
            }
            _ => {
                raw.push(c);
                field.push(c);
            }
        }
    }
    fields.push(take_field(&mut field));
    push_record(&mut records, start_line, &mut raw, &mut fields);

    records
}

fn take_field(field: &mut String) -> String {
    std::mem::take(field).trim().to_string()
}

fn push_record(records: &mut Vec<Record>, line: usize, raw: &mut String, fields: &mut Vec<String>) {
    let raw = std::mem::take(raw);
    let fields = std::mem::take(fields);
    if raw.trim().is_empty() {
        return;
    }
    records.push(Record {
        line,
        raw: raw.trim().to_string(),
        fields,
    });
}

fn positional_columns() -> HashMap<String, usize> {
    POSITIONAL_COLUMNS
        .iter()
        .enumerate()
        .map(|(i, name)| (name.to_string(), i))
        .collect()
}

fn header_columns(fields: &[String]) -> HashMap<String, usize> {
    fields
        .iter()
        .enumerate()
        .map(|(i, name)| (name.to_ascii_lowercase(), i))
        .collect()
}

fn parse_row(
    fields: &[String],
    columns: &HashMap<String, usize>,
    line: usize,
) -> Result<Candidate, SetupError> {
    let field = |name: &str| column_value(fields, columns, name);
    let parse_err = |column: &str, value: &str| SetupError::InputParse {
        line,
        reason: format!("{} 的值 '{}' 无效", column, value),
    };

    let source_id = match field("source_id") {
        Some(v) => parse_integer(v).ok_or_else(|| parse_err("source_id", v))?,
        None => {
            return Err(SetupError::InputParse {
                line,
                reason: "缺少 source_id".to_string(),
            })
        }
    };
    let healpix_id = match field("healpix_id") {
        Some(v) => parse_integer(v).ok_or_else(|| parse_err("healpix_id", v))?,
        None => 0,
    };
    let ra = match field("ra") {
        Some(v) => Some(v.parse::<f64>().map_err(|_| parse_err("ra", v))?),
        None => None,
    };
    let dec = match field("dec") {
        Some(v) => Some(v.parse::<f64>().map_err(|_| parse_err("dec", v))?),
        None => None,
    };

    Ok(Candidate {
        source_id,
        healpix_id,
        ra,
        dec,
        reason: field("reason").map(str::to_string),
    })
}

fn column_value<'a>(
    fields: &'a [String],
    columns: &HashMap<String, usize>,
    name: &str,
) -> Option<&'a str> {
    columns
        .get(name)
        .and_then(|&i| fields.get(i))
        .map(String::as_str)
        .filter(|v| !v.is_empty())
}

/// 整数列也接受 `123.0` 这种写法
fn parse_integer(value: &str) -> Option<u64> {
    value.parse::<u64>().ok().or_else(|| {
        value
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0 && *f < u64::MAX as f64)
            .map(|f| f as u64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_columns_in_any_order() {
        let content = "reason,ra,dec,source_id,healpix_id\nperiodic,10.5,-3.25,101,7\n,,,102,\n";
        let (header, candidates) = parse_candidates(content).unwrap();

        assert_eq!(header.as_deref(), Some("reason,ra,dec,source_id,healpix_id"));
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].source_id, 101);
        assert_eq!(candidates[0].healpix_id, 7);
        assert_eq!(candidates[0].ra, Some(10.5));
        assert_eq!(candidates[0].dec, Some(-3.25));
        assert_eq!(candidates[0].reason.as_deref(), Some("periodic"));
        assert_eq!(candidates[1], Candidate::new(102));
    }

    #[test]
    fn test_headerless_positional_rows_with_comments() {
        let content = "# exported ids\n\"201\",\"3\",\"1.0\",\"2.0\"\n\n202\n203,4.0\n";
        let (header, candidates) = parse_candidates(content).unwrap();

        assert!(header.is_none());
        let ids: Vec<u64> = candidates.iter().map(|c| c.source_id).collect();
        assert_eq!(ids, vec![201, 202, 203]);
        assert_eq!(candidates[0].healpix_id, 3);
        assert_eq!(candidates[2].healpix_id, 4);
    }

    #[test]
    fn test_quoted_comma_stays_in_field() {
        let content = "source_id,reason,ra\n1,\"periodic, strong\",3.0\n";
        let (_, candidates) = parse_candidates(content).unwrap();
        assert_eq!(candidates[0].reason.as_deref(), Some("periodic, strong"));
        assert_eq!(candidates[0].ra, Some(3.0));

        let content = "source_id,reason\n2,\"eclipsing, \"\"EA\"\"\"\n";
        let (_, candidates) = parse_candidates(content).unwrap();
        assert_eq!(candidates[0].reason.as_deref(), Some("eclipsing, \"EA\""));
    }

    #[test]
    fn test_quoted_newline_keeps_line_numbers() {
        let content = "source_id,reason\n1,\"two\nlines\"\nabc,x\n";
        let err = parse_candidates(content).unwrap_err();
        assert!(matches!(err, SetupError::InputParse { line: 4, .. }));

        let (_, candidates) = parse_candidates("source_id,reason\n1,\"two\nlines\"\n").unwrap();
        assert_eq!(candidates[0].reason.as_deref(), Some("two\nlines"));
    }

    #[test]
    fn test_bom_before_header_is_ignored() {
        let content = "\u{feff}source_id,healpix_id\r\n1,0\r\n2,5\r\n";
        let (header, candidates) = parse_candidates(content).unwrap();
        assert_eq!(header.as_deref(), Some("source_id,healpix_id"));
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[1].healpix_id, 5);
    }

    #[test]
    fn test_comment_with_quote_does_not_open_field() {
        let content = "# it's \"odd\nsource_id\n7\n";
        let (header, candidates) = parse_candidates(content).unwrap();
        assert_eq!(header.as_deref(), Some("source_id"));
        assert_eq!(candidates, vec![Candidate::new(7)]);
    }

    #[test]
    fn test_duplicate_source_ids_keep_first() {
        let content = "source_id,reason\n5,a\n6,b\n5,c\n";
        let (_, candidates) = parse_candidates(content).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].reason.as_deref(), Some("a"));
    }

    #[test]
    fn test_bad_source_id_reports_line() {
        let content = "source_id\n1\nabc\n";
        let err = parse_candidates(content).unwrap_err();
        assert!(matches!(err, SetupError::InputParse { line: 3, .. }));
    }

    #[test]
    fn test_header_without_source_id_is_rejected() {
        let err = parse_candidates("id,ra,dec\n1,2,3\n").unwrap_err();
        assert!(matches!(err, SetupError::InputParse { line: 1, .. }));
    }

    #[test]
    fn test_open_missing_file() {
        let err = tokio_test::block_on(CandidateSource::open(Path::new(
            "/nonexistent/candidates.csv",
        )))
        .unwrap_err();
        assert!(matches!(err, SetupError::InputNotFound { .. }));
    }

    #[tokio::test]
    async fn test_reset_keeps_only_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("candidates.csv");
        std::fs::write(&path, "source_id,healpix_id\n1,0\n2,0\n").unwrap();

        let source = CandidateSource::open(&path).await.unwrap();
        assert_eq!(source.candidates().len(), 2);
        assert_eq!(source.result_path(), dir.path().join("candidates_results.json"));

        source.reset().await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "source_id,healpix_id\n");

        let reopened = CandidateSource::open(&path).await.unwrap();
        assert!(reopened.candidates().is_empty());
    }
}
