/*
 * @Author       : 老董
 * @Description  : GraphInner 模型摘要（类似 Keras 的 `model.summary()`）
 */

use super::GraphInner;

struct SummaryRow {
    name: String,
    type_name: &'static str,
    shape: String,
    params: Option<usize>,
    parents: String,
}

impl GraphInner {
    /// 返回模型摘要字符串（Unicode 文本表格，按节点创建顺序）
    ///
    /// ```ignore
    /// // ┌──────────┬───────────┬────────────────┬────────────┬────────┐
    /// // │ 节点名称 │ 类型      │ 输出形状       │     参数量 │ 父节点 │
    /// // ├──────────┼───────────┼────────────────┼────────────┼────────┤
    /// // │ input    │ Input     │ [1, 3, 224, 224] │        - │ -      │
    /// // ...
    /// ```
    pub fn summary_string(&self) -> String {
        let rows: Vec<SummaryRow> = self
            .nodes()
            .into_iter()
            .filter_map(|id| self.get_node(id).ok())
            .map(|node| {
                let parents = self
                    .get_node_parents(node.id())
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|p| self.get_node_name(p).ok())
                    .collect::<Vec<_>>();
                SummaryRow {
                    name: node.name().to_string(),
                    type_name: node.type_name(),
                    shape: format!("{:?}", node.value_expected_shape()),
                    params: node
                        .is_parameter()
                        .then(|| node.value_expected_shape().iter().product()),
                    parents: if parents.is_empty() {
                        "-".to_string()
                    } else {
                        parents.join(", ")
                    },
                }
            })
            .collect();

        let name_w = column_width(&rows, "节点名称", |r| display_width(&r.name));
        let type_w = column_width(&rows, "类型", |r| r.type_name.len());
        let shape_w = column_width(&rows, "输出形状", |r| r.shape.len());
        let param_w = 10;
        let parent_w = column_width(&rows, "父节点", |r| display_width(&r.parents));
        let widths = [name_w, type_w, shape_w, param_w, parent_w];

        let rule = |left: &str, mid: &str, right: &str| {
            let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
            format!("{left}{}{right}\n", segments.join(mid))
        };
        let line = |cells: [&str; 5]| {
            let mut out = String::from("│");
            for (i, (cell, width)) in cells.iter().zip(widths).enumerate() {
                let pad = " ".repeat(width.saturating_sub(display_width(cell)));
                // 参数量列右对齐
                if i == 3 {
                    out.push_str(&format!(" {pad}{cell} │"));
                } else {
                    out.push_str(&format!(" {cell}{pad} │"));
                }
            }
            out.push('\n');
            out
        };

        let mut output = format!("模型摘要: {}\n", self.name());
        output.push_str(&rule("┌", "┬", "┐"));
        output.push_str(&line(["节点名称", "类型", "输出形状", "参数量", "父节点"]));
        output.push_str(&rule("├", "┼", "┤"));
        for row in &rows {
            let params = row
                .params
                .map_or_else(|| "-".to_string(), format_number);
            output.push_str(&line([
                &row.name,
                row.type_name,
                &row.shape,
                &params,
                &row.parents,
            ]));
        }
        output.push_str(&rule("└", "┴", "┘"));

        let total = self.parameter_count();
        output.push_str(&format!("总参数量: {}\n", format_number(total)));
        output.push_str(&format!("可训练参数: {}\n", format_number(total)));
        output
    }
}

fn column_width(rows: &[SummaryRow], header: &str, cell: impl Fn(&SummaryRow) -> usize) -> usize {
    rows.iter()
        .map(cell)
        .max()
        .unwrap_or(0)
        .max(display_width(header))
}

/// 千分位格式化：1234567 -> "1,234,567"
fn format_number(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

// 终端中 CJK 字符占两列
fn display_width(s: &str) -> usize {
    s.chars()
        .map(|c| if ('\u{4e00}'..='\u{9fff}').contains(&c) { 2 } else { 1 })
        .sum()
}
