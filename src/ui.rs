use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, BorderType, Paragraph, Tabs, Widget},
};

use crate::app::{App, GLOBAL_FIELDS, GlobalField, NODE_FIELDS, NodeField};
use crate::prefs::{SaveStatus, Tab};

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let areas = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(10),
            Constraint::Length(1),
            Constraint::Length(2),
        ])
        .split(area);

        let tabs = Tabs::new(vec![" Global ", " Nodes "])
            .select(match self.panel.tab {
                Tab::Global => 0,
                Tab::Node => 1,
            })
            .style(Style::default().fg(Color::Cyan).bg(Color::Black))
            .highlight_style(
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .divider("|");
        tabs.render(areas[0], buf);

        let (title, lines) = match self.panel.tab {
            Tab::Global => (String::from(" UI defaults "), self.global_lines()),
            Tab::Node => {
                let title = if self.panel.node.dirty() {
                    String::from(" Node configuration (modified) ")
                } else {
                    String::from(" Node configuration ")
                };
                (title, self.node_lines())
            }
        };

        let body_block = Block::bordered()
            .title(title)
            .title_alignment(Alignment::Center)
            .border_type(BorderType::Rounded)
            .style(Style::default().fg(Color::Cyan));
        Paragraph::new(lines)
            .block(body_block)
            .bg(Color::Black)
            .render(areas[1], buf);

        Paragraph::new(self.status_line()).render(areas[2], buf);

        let controls_text = format!(
            "\
        `tab` → switch tab | `↑/↓` → field | `←/→` → change value | `space` → toggle\n\
        `enter` → apply | `r` → reload | `ctrl+C` → quit | in flight: {}",
            self.panel.pending_len(),
        );
        Paragraph::new(controls_text)
            .bg(Color::DarkGray)
            .fg(Color::White)
            .alignment(Alignment::Center)
            .render(areas[3], buf);
    }
}

impl App {
    fn global_lines(&self) -> Vec<Line<'static>> {
        GLOBAL_FIELDS
            .iter()
            .enumerate()
            .map(|(i, field)| {
                let selected = i == self.global_cursor;
                match field {
                    GlobalField::Action => {
                        option_row("Default action", self.panel.global.action.get_str(), selected)
                    }
                    GlobalField::Duration => option_row(
                        "Default duration",
                        self.panel.global.duration.get_str(),
                        selected,
                    ),
                    GlobalField::Target => {
                        option_row("Default target", self.panel.global.target.get_str(), selected)
                    }
                    GlobalField::Timeout => option_row(
                        "Popup timeout (s)",
                        &self.panel.global.timeout.to_string(),
                        selected,
                    ),
                }
            })
            .collect()
    }

    fn node_lines(&self) -> Vec<Line<'static>> {
        let selector_value = match self.panel.selected_addr() {
            Some(addr) => format!(
                "{addr}  ({}/{})",
                self.panel.selected + 1,
                self.panel.node_addrs.len()
            ),
            None => String::from("no nodes connected"),
        };

        let mut lines = Vec::new();
        for (i, field) in NODE_FIELDS.iter().enumerate() {
            let selected = i == self.node_cursor;
            match field {
                NodeField::Selector => {
                    lines.push(option_row("Node", &selector_value, selected));
                    // Read-only metadata under the selector.
                    let meta = if self.panel.node.name.is_empty() {
                        String::new()
                    } else {
                        format!(
                            "    {} (daemon {})",
                            self.panel.node.name, self.panel.node.version
                        )
                    };
                    lines.push(Line::from(Span::styled(
                        meta,
                        Style::default().fg(Color::DarkGray),
                    )));
                }
                NodeField::Action => lines.push(option_row(
                    "Default action",
                    self.panel.node.action.get_str(),
                    selected,
                )),
                NodeField::Duration => lines.push(option_row(
                    "Default duration",
                    self.panel.node.duration.get_str(),
                    selected,
                )),
                NodeField::MonitorMethod => lines.push(option_row(
                    "Process monitor",
                    self.panel.node.monitor_method.get_str(),
                    selected,
                )),
                NodeField::LogLevel => lines.push(option_row(
                    "Log level",
                    self.panel.node.log_level.get_str(),
                    selected,
                )),
                NodeField::InterceptUnknown => lines.push(checkbox_row(
                    "Intercept unknown connections",
                    self.panel.node.intercept_unknown,
                    selected,
                )),
                NodeField::ApplyToAll => lines.push(checkbox_row(
                    "Apply to all nodes",
                    self.panel.node.apply_to_all,
                    selected,
                )),
            }
        }
        lines
    }

    fn status_line(&self) -> Line<'static> {
        match &self.panel.status {
            SaveStatus::Idle => Line::default(),
            SaveStatus::Applying { since } => Line::styled(
                format!(
                    " Applying configuration... ({}s)",
                    since.elapsed().as_secs()
                ),
                Style::default().fg(Color::Yellow),
            ),
            SaveStatus::Success => Line::styled(
                " Configuration applied.",
                Style::default().fg(Color::Green),
            ),
            SaveStatus::Error(msg) => Line::styled(
                format!(" Error applying configuration: {msg}"),
                Style::default().fg(Color::Red),
            ),
        }
    }
}

fn option_row(label: &str, value: &str, selected: bool) -> Line<'static> {
    let marker = if selected { "» " } else { "  " };
    let style = if selected {
        Style::default().fg(Color::Black).bg(Color::Cyan)
    } else {
        Style::default().fg(Color::Cyan)
    };
    Line::from(vec![
        Span::raw(String::from(marker)),
        Span::styled(format!("{label:<24}"), style),
        Span::styled(format!("◂ {value} ▸"), style.add_modifier(Modifier::BOLD)),
    ])
}

fn checkbox_row(label: &str, checked: bool, selected: bool) -> Line<'static> {
    let marker = if selected { "» " } else { "  " };
    let style = if selected {
        Style::default().fg(Color::Black).bg(Color::Cyan)
    } else {
        Style::default().fg(Color::Cyan)
    };
    let box_str = if checked { "[x] " } else { "[ ] " };
    Line::from(vec![
        Span::raw(String::from(marker)),
        Span::styled(format!("{box_str}{label}"), style),
    ])
}
