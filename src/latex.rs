//! LaTeX rendering of tables (booktabs style) and the significance table
//! of fitted model contrasts.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::export::{Cell, Table};

/// How a table is rendered as LaTeX.
#[derive(Debug, Clone, PartialEq)]
pub struct LatexOptions {
    /// `longtable` instead of `tabular`.
    pub longtable: bool,
    /// Escape LaTeX special characters in cells and headers.
    pub escape: bool,
    /// Digits after the decimal point for floats; `None` prints them as is.
    pub float_digits: Option<usize>,
}

impl Default for LatexOptions {
    fn default() -> Self {
        LatexOptions {
            longtable: false,
            escape: true,
            float_digits: None,
        }
    }
}

/// Escape the characters LaTeX treats specially.
///
/// # Example
/// ```
/// use community_stats::latex::escape_latex;
/// assert_eq!(escape_latex("50% of scikit_learn & co"), r"50\% of scikit\_learn \& co");
/// ```
pub fn escape_latex(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str(r"\textbackslash{}"),
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            '~' => out.push_str(r"\textasciitilde{}"),
            '^' => out.push_str(r"\textasciicircum{}"),
            _ => out.push(c),
        }
    }
    out
}

fn format_cell(cell: &Cell, opts: &LatexOptions) -> String {
    let raw = match (cell, opts.float_digits) {
        (Cell::Float(x), Some(digits)) => format!("{x:.digits$}"),
        _ => cell.to_string(),
    };
    if opts.escape { escape_latex(&raw) } else { raw }
}

fn column_spec(table: &Table) -> String {
    (0..table.headers.len())
        .map(|i| {
            let numeric = table
                .rows
                .iter()
                .map(|r| &r[i])
                .find(|c| **c != Cell::Empty)
                .is_some_and(Cell::is_numeric);
            if numeric { 'r' } else { 'l' }
        })
        .collect()
}

fn row_line(cells: impl Iterator<Item = String>) -> String {
    format!("{} \\\\\n", cells.collect::<Vec<_>>().join(" & "))
}

/// Render a table as a booktabs `tabular` or `longtable`.
pub fn render_latex(table: &Table) -> String {
    let opts = &table.latex;
    let spec = column_spec(table);
    let header = row_line(table.headers.iter().map(|h| {
        if opts.escape { escape_latex(h) } else { h.clone() }
    }));

    let mut out = String::new();
    if opts.longtable {
        out.push_str(&format!("\\begin{{longtable}}{{{spec}}}\n"));
        out.push_str("\\toprule\n");
        out.push_str(&header);
        out.push_str("\\midrule\n\\endfirsthead\n\n\\toprule\n");
        out.push_str(&header);
        out.push_str("\\midrule\n\\endhead\n\\midrule\n");
        out.push_str(&format!(
            "\\multicolumn{{{}}}{{r}}{{{{Continued on next page}}}} \\\\\n",
            table.headers.len()
        ));
        out.push_str("\\midrule\n\\endfoot\n\n\\bottomrule\n\\endlastfoot\n");
    } else {
        out.push_str(&format!("\\begin{{tabular}}{{{spec}}}\n"));
        out.push_str("\\toprule\n");
        out.push_str(&header);
        out.push_str("\\midrule\n");
    }
    for row in &table.rows {
        out.push_str(&row_line(row.iter().map(|c| format_cell(c, opts))));
    }
    if opts.longtable {
        out.push_str("\\end{longtable}\n");
    } else {
        out.push_str("\\bottomrule\n\\end{tabular}\n");
    }
    out
}

/// Significance code of an (adjusted) p-value.
///
/// # Example
/// ```
/// use community_stats::latex::significance_stars;
/// assert_eq!(significance_stars(0.0004), "***");
/// assert_eq!(significance_stars(0.07), ".");
/// assert_eq!(significance_stars(0.5), "");
/// ```
pub fn significance_stars(p: f64) -> &'static str {
    if p < 0.001 {
        "***"
    } else if p < 0.01 {
        "**"
    } else if p < 0.05 {
        "*"
    } else if p < 0.1 {
        "."
    } else {
        ""
    }
}

fn display_name(column: &str) -> String {
    match column {
        "p_val_adjusted" | "p_adjusted" => "p-val adj.".to_string(),
        "p_val" | "p_value" => "p-val.".to_string(),
        c if c.starts_with("t_") || c == "statistic" => "t-stat".to_string(),
        c => c.to_string(),
    }
}

fn unquote(token: &str) -> &str {
    token.trim_matches('"')
}

/// A whitespace-delimited model result table, as written by R.
#[derive(Debug, Clone, PartialEq)]
struct ModelResults {
    columns: Vec<String>,
    labels: Vec<String>,
    rows: Vec<Vec<String>>,
}

fn read_model_results(path: &Path) -> Result<ModelResults> {
    if !path.is_file() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path)?;
    let mut lines = content.lines().filter(|l| !l.trim().is_empty());
    let columns: Vec<String> = lines
        .next()
        .ok_or_else(|| Error::InvalidInput(format!("{} is empty", path.display())))?
        .split_whitespace()
        .map(|t| unquote(t).to_string())
        .collect();

    let mut labels = Vec::new();
    let mut rows = Vec::new();
    for (i, line) in lines.enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().map(unquote).collect();
        if tokens.len() == columns.len() + 1 {
            labels.push(tokens[0].to_string());
            rows.push(tokens[1..].iter().map(|t| t.to_string()).collect());
        } else if tokens.len() == columns.len() {
            labels.push((i + 1).to_string());
            rows.push(tokens.iter().map(|t| t.to_string()).collect());
        } else {
            return Err(Error::Parse {
                path: path.to_path_buf(),
                message: format!(
                    "row {}: expected {} fields, found {}",
                    i + 1,
                    columns.len(),
                    tokens.len()
                ),
            });
        }
    }
    Ok(ModelResults {
        columns,
        labels,
        rows,
    })
}

/// Three-level row labels, one comma separated line per row, no header.
fn read_row_labels(path: &Path) -> Result<Vec<[String; 3]>> {
    if !path.is_file() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let mut labels = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let level = |i: usize| record.get(i).unwrap_or("").trim().to_string();
        labels.push([level(0), level(1), level(2)]);
    }
    Ok(labels)
}

/// Blank leading label levels repeated from the previous row.
fn sparsify(labels: &[[String; 3]]) -> Vec<[String; 3]> {
    let mut out = Vec::with_capacity(labels.len());
    for (i, row) in labels.iter().enumerate() {
        let mut shown = row.clone();
        if i > 0 {
            let prev = &labels[i - 1];
            for level in 0..2 {
                if row[..=level] == prev[..=level] {
                    shown[level] = String::new();
                } else {
                    break;
                }
            }
        }
        out.push(shown);
    }
    out
}

/// Build the LaTeX-ready significance table of a model result file: the
/// `model` column is dropped, a `sig.` column is derived from
/// `p_val_adjusted` and rows are optionally relabelled by a three-level
/// label file.
pub fn pvalue_table(path: &Path, labels: Option<&Path>) -> Result<Table> {
    let results = read_model_results(path)?;
    let p_adj = results
        .columns
        .iter()
        .position(|c| c == "p_val_adjusted")
        .ok_or_else(|| {
            Error::InvalidInput(format!("{} has no p_val_adjusted column", path.display()))
        })?;
    let kept: Vec<usize> = (0..results.columns.len())
        .filter(|&i| results.columns[i] != "model")
        .collect();

    let row_labels: Vec<Vec<String>> = match labels {
        Some(label_path) => {
            let levels = read_row_labels(label_path)?;
            if levels.len() != results.rows.len() {
                return Err(Error::InvalidInput(format!(
                    "{} has {} labels for {} rows",
                    label_path.display(),
                    levels.len(),
                    results.rows.len()
                )));
            }
            sparsify(&levels).into_iter().map(|l| l.to_vec()).collect()
        }
        None => results.labels.iter().map(|l| vec![l.clone()]).collect(),
    };
    let n_levels = if labels.is_some() { 3 } else { 1 };

    let mut headers: Vec<String> = vec![String::new(); n_levels];
    headers.extend(kept.iter().map(|&i| display_name(&results.columns[i])));
    headers.push("sig.".to_string());

    let mut table = Table::new("pvalues", headers);
    table.latex = LatexOptions {
        longtable: true,
        escape: false,
        float_digits: Some(3),
    };
    for (row, label) in results.rows.iter().zip(row_labels) {
        let p: f64 = row[p_adj].parse().map_err(|_| Error::Parse {
            path: path.to_path_buf(),
            message: format!("invalid p-value {:?}", row[p_adj]),
        })?;
        let mut cells: Vec<Cell> = label.into_iter().map(Cell::Text).collect();
        cells.extend(kept.iter().map(|&i| match row[i].parse::<f64>() {
            Ok(x) => Cell::from(x),
            Err(_) => Cell::Text(row[i].clone()),
        }));
        cells.push(Cell::from(significance_stars(p)));
        table.push(cells);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let p = dir.join(name);
        fs::write(&p, content).unwrap();
        p
    }

    const MODEL: &str = "\"model\" \"t_value\" \"p_val\" \"p_val_adjusted\"\n\
        \"issue:member\" \"1W\" 3.2 0.0004 0.0009\n\
        \"issue:nonmember\" \"1W\" 1.9 0.03 0.07\n\
        \"pr:member\" \"2W\" 0.4 0.61 0.8\n";

    #[test]
    fn tabular_with_numeric_alignment() {
        let mut t = Table::new("summary", vec!["Project", "Issues", "Authors"]);
        t.push(vec!["scikit_learn".into(), 10usize.into(), 3usize.into()]);
        let out = render_latex(&t);
        assert!(out.starts_with("\\begin{tabular}{lrr}\n\\toprule\n"));
        assert!(out.contains("Project & Issues & Authors \\\\\n\\midrule\n"));
        assert!(out.contains("scikit\\_learn & 10 & 3 \\\\\n"));
        assert!(out.ends_with("\\bottomrule\n\\end{tabular}\n"));
    }

    #[test]
    fn pvalues_with_stars_and_row_names() {
        let td = tempfile::tempdir().unwrap();
        let p = write(td.path(), "model.tsv", MODEL);
        let t = pvalue_table(&p, None).unwrap();
        assert_eq!(t.headers, vec!["", "t-stat", "p-val.", "p-val adj.", "sig."]);
        assert_eq!(t.len(), 3);
        assert_eq!(t.rows[0][0], Cell::Text("issue:member".into()));
        assert_eq!(t.get(0, "sig."), Some(&Cell::Text("***".into())));
        assert_eq!(t.get(1, "sig."), Some(&Cell::Text(".".into())));
        assert_eq!(t.get(2, "sig."), Some(&Cell::Text("".into())));

        let latex = render_latex(&t);
        assert!(latex.starts_with("\\begin{longtable}{lrrrl}"));
        assert!(latex.contains("issue:member & 3.200 & 0.000 & 0.001 & *** \\\\"));
        assert!(latex.contains("\\endhead"));
        assert!(latex.ends_with("\\end{longtable}\n"));
    }

    #[test]
    fn pvalues_relabelled_and_sparsified() {
        let td = tempfile::tempdir().unwrap();
        let p = write(td.path(), "model.tsv", MODEL);
        let labels = write(
            td.path(),
            "columns",
            "1W,$\\mu_\\text{PR}$,\n1W,Time opened,\n2W,Time opened,Issue\n",
        );
        let t = pvalue_table(&p, Some(&labels)).unwrap();
        assert_eq!(t.headers.len(), 7);
        assert_eq!(t.rows[0][0], Cell::Text("1W".into()));
        assert_eq!(t.rows[1][0], Cell::Text("".into()));
        assert_eq!(t.rows[1][1], Cell::Text("Time opened".into()));
        assert_eq!(t.rows[2][0], Cell::Text("2W".into()));
        // unescaped math survives
        assert!(render_latex(&t).contains("$\\mu_\\text{PR}$"));
    }

    #[test]
    fn label_count_must_match() {
        let td = tempfile::tempdir().unwrap();
        let p = write(td.path(), "model.tsv", MODEL);
        let labels = write(td.path(), "columns", "1W,a,\n");
        assert!(matches!(
            pvalue_table(&p, Some(&labels)),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn missing_adjusted_column() {
        let td = tempfile::tempdir().unwrap();
        let p = write(td.path(), "model.tsv", "model p_val\nx 1W 0.1\n");
        assert!(pvalue_table(&p, None).is_err());
    }

    #[test]
    fn ragged_rows_are_parse_errors() {
        let td = tempfile::tempdir().unwrap();
        let p = write(td.path(), "model.tsv", "model p_val p_val_adjusted\nx 1W\n");
        assert!(matches!(pvalue_table(&p, None), Err(Error::Parse { .. })));
    }
}
