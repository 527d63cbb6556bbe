use serde::Serialize;
use sheetbot_core::Row;

pub const USAGE_HINT: &str = "请输入搜索内容（例如：`英雄皮肤名称`）";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum TextObject {
    PlainText { content: String },
    LarkMd { content: String },
}

impl TextObject {
    pub fn plain(content: impl Into<String>) -> Self {
        Self::PlainText { content: content.into() }
    }

    pub fn markdown(content: impl Into<String>) -> Self {
        Self::LarkMd { content: content.into() }
    }

    pub fn content(&self) -> &str {
        match self {
            Self::PlainText { content } | Self::LarkMd { content } => content,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderTemplate {
    Blue,
    Red,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CardConfig {
    pub wide_screen_mode: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CardHeader {
    pub title: TextObject,
    pub template: HeaderTemplate,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TableColumn {
    pub text: String,
    pub width: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TableCell {
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum CardElement {
    Div { text: TextObject },
    Hr,
    Table { width: String, columns: Vec<TableColumn>, rows: Vec<TableRow> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CardKind {
    Results,
    Empty,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CardDocument {
    pub config: CardConfig,
    pub header: CardHeader,
    pub elements: Vec<CardElement>,
    #[serde(skip)]
    pub kind: CardKind,
    #[serde(skip)]
    pub fallback_text: String,
}

pub struct CardBuilder {
    kind: CardKind,
    fallback_text: String,
    header: CardHeader,
    elements: Vec<CardElement>,
}

impl CardBuilder {
    pub fn new(kind: CardKind, fallback_text: impl Into<String>) -> Self {
        Self {
            kind,
            fallback_text: fallback_text.into(),
            header: CardHeader { title: TextObject::plain(""), template: HeaderTemplate::Blue },
            elements: Vec::new(),
        }
    }

    pub fn header(mut self, title: impl Into<String>, template: HeaderTemplate) -> Self {
        self.header = CardHeader { title: TextObject::plain(title), template };
        self
    }

    pub fn markdown(mut self, content: impl Into<String>) -> Self {
        self.elements.push(CardElement::Div { text: TextObject::markdown(content) });
        self
    }

    pub fn divider(mut self) -> Self {
        self.elements.push(CardElement::Hr);
        self
    }

    pub fn table<F>(mut self, build: F) -> Self
    where
        F: FnOnce(&mut TableBuilder),
    {
        let mut builder = TableBuilder::default();
        build(&mut builder);
        self.elements.push(builder.build());
        self
    }

    pub fn build(self) -> CardDocument {
        CardDocument {
            config: CardConfig { wide_screen_mode: true },
            header: self.header,
            elements: self.elements,
            kind: self.kind,
            fallback_text: self.fallback_text,
        }
    }
}

#[derive(Default)]
pub struct TableBuilder {
    columns: Vec<TableColumn>,
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn column(&mut self, text: impl Into<String>) -> &mut Self {
        self.columns.push(TableColumn { text: text.into(), width: "auto".to_owned() });
        self
    }

    pub fn row<I, S>(&mut self, cells: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let cells = cells.into_iter().map(|text| TableCell { text: text.into() }).collect();
        self.rows.push(TableRow { cells });
        self
    }

    fn build(self) -> CardElement {
        CardElement::Table { width: "auto".to_owned(), columns: self.columns, rows: self.rows }
    }
}

/// Results card, or the "nothing found" card when `rows` is empty.
pub fn render(query: &str, rows: &[Row]) -> CardDocument {
    let Some(first) = rows.first() else {
        return CardBuilder::new(CardKind::Empty, format!("No records found for {query}"))
            .header("⚠️ 未找到结果", HeaderTemplate::Red)
            .markdown(format!("未找到包含 `{query}` 的记录，请尝试其他关键词。"))
            .build();
    };

    // Every row is projected onto the same columns, so the first row's order is the table's.
    let columns: Vec<&str> = first.columns().collect();
    let count = rows.len();

    CardBuilder::new(CardKind::Results, format!("{count} record(s) found for {query}"))
        .header("🔍 搜索结果", HeaderTemplate::Blue)
        .markdown(format!("**搜索词**: `{query}`\n**共找到 {count} 条记录**"))
        .divider()
        .table(|table| {
            for column in &columns {
                table.column(*column);
            }
            for row in rows {
                table.row(columns.iter().map(|column| {
                    row.get(column).map(ToString::to_string).unwrap_or_default()
                }));
            }
        })
        .build()
}

pub fn error_card(message: &str) -> CardDocument {
    CardBuilder::new(CardKind::Error, format!("Search failed: {message}"))
        .header("❌ 错误", HeaderTemplate::Red)
        .markdown(format!("搜索失败：\n```\n{message}\n```\n请联系管理员检查SVN配置。"))
        .build()
}
