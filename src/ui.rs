use crate::config::DashboardConfig;
use crate::error::DashboardError;
use crate::filters::SelectionState;
use crate::forecast::AdditiveTrend;
use crate::loader::DataStore;
use crate::model::{ForecastSeries, MetricsSummary};
use crate::pipeline::{Overview, SelectionView};
use chrono::{Datelike, NaiveDate};
use eframe::egui;
use egui::{Color32, Context, CornerRadius, FontFamily, FontId, Margin, RichText, Stroke, Visuals};
use egui_extras::{Column, TableBuilder};
use egui_plot::{Bar, BarChart, Legend, Line, LineStyle, Plot, PlotPoint, PlotPoints, Points, Text, VLine};
use tracing::{error, info, warn};

const HEADING_COLOR: Color32 = Color32::from_rgb(0, 51, 102);
const METRIC_FILL: Color32 = Color32::from_rgb(232, 237, 243);
const ACTUAL_COLOR: Color32 = Color32::from_rgb(31, 119, 180);
const FORECAST_COLOR: Color32 = Color32::from_rgb(255, 127, 14);
const BAND_COLOR: Color32 = Color32::from_rgb(255, 190, 130);

const BAR_PALETTE: [Color32; 6] = [
    Color32::from_rgb(99, 110, 250),
    Color32::from_rgb(239, 85, 59),
    Color32::from_rgb(0, 204, 150),
    Color32::from_rgb(171, 99, 250),
    Color32::from_rgb(255, 161, 90),
    Color32::from_rgb(25, 211, 243),
];

pub fn set_custom_style(ctx: &Context) {
    // Light report theme with a navy accent
    let mut visuals = Visuals::light();

    visuals.panel_fill = Color32::WHITE;
    visuals.window_fill = Color32::WHITE;
    visuals.faint_bg_color = Color32::from_rgb(245, 247, 250);
    visuals.extreme_bg_color = Color32::from_rgb(250, 251, 253);

    visuals.widgets.inactive.bg_stroke = Stroke::new(1.0, Color32::from_rgb(200, 208, 218));
    visuals.widgets.hovered.bg_stroke = Stroke::new(1.5, HEADING_COLOR);
    visuals.selection.bg_fill = Color32::from_rgb(204, 221, 238);
    visuals.selection.stroke = Stroke::new(1.0, HEADING_COLOR);

    ctx.set_visuals(visuals);

    let mut style = (*ctx.style()).clone();

    style.spacing.item_spacing = egui::vec2(8.0, 6.0);
    style.spacing.window_margin = Margin::same(12);
    style.spacing.button_padding = egui::vec2(12.0, 6.0);

    style.text_styles.insert(
        egui::TextStyle::Body,
        FontId::new(15.0, FontFamily::Proportional),
    );
    style.text_styles.insert(
        egui::TextStyle::Heading,
        FontId::new(22.0, FontFamily::Proportional),
    );

    ctx.set_style(style);
}

enum Pick {
    State(String),
    Store(String),
    Product(String),
}

pub struct RetailDashboardApp {
    config: DashboardConfig,
    store: DataStore,
    model: AdditiveTrend,
    load_error: Option<String>,
    overview: Option<Overview>,
    selection: SelectionState,
    view: Option<SelectionView>,
}

impl RetailDashboardApp {
    pub fn new(config: DashboardConfig) -> Self {
        let model = AdditiveTrend::new(config.interval_width).unwrap_or_else(|e| {
            warn!(error = %e, "falling back to the default forecast interval");
            AdditiveTrend::default()
        });
        let mut app = Self {
            store: DataStore::new(config.data_path.clone()),
            config,
            model,
            load_error: None,
            overview: None,
            selection: SelectionState::default(),
            view: None,
        };
        app.load_data();
        app
    }

    fn load_data(&mut self) {
        let table = match self.store.load() {
            Ok(table) => table,
            Err(e) => {
                error!(path = %self.store.path().display(), error = %e, "cannot load sales data");
                self.load_error = Some(e.to_string());
                return;
            }
        };

        self.load_error = None;
        self.overview = Some(Overview::build(table, &self.config));
        self.selection = SelectionState::new(table);
        self.view = self
            .selection
            .selection()
            .map(|sel| SelectionView::build(table, &sel, &self.config, &self.model));
    }

    fn apply_pick(&mut self, pick: Pick) {
        let Ok(table) = self.store.load() else {
            return;
        };

        match pick {
            Pick::State(v) => self.selection.set_state(table, v),
            Pick::Store(v) => self.selection.set_store(table, v),
            Pick::Product(v) => self.selection.set_product(table, v),
        }

        let selection = self.selection.selection();
        info!(?selection, "selection changed");
        self.view = selection.map(|sel| SelectionView::build(table, &sel, &self.config, &self.model));
    }

    fn filter_panel(&self, ui: &mut egui::Ui) -> Option<Pick> {
        ui.heading(RichText::new("🔍 Filter Options").color(HEADING_COLOR));
        ui.separator();

        let sel = &self.selection;
        let mut pick = None;

        if let Some(v) = choice_combo(ui, "state", "Select State", sel.state.as_deref(), &sel.states) {
            pick = Some(Pick::State(v));
        }
        if let Some(v) = choice_combo(ui, "store", "Select Store", sel.store_id.as_deref(), &sel.stores) {
            pick = Some(Pick::Store(v));
        }
        if let Some(v) = choice_combo(ui, "product", "Select Product", sel.product_id.as_deref(), &sel.products) {
            pick = Some(Pick::Product(v));
        }

        if let Some(view) = &self.view {
            ui.add_space(10.0);
            ui.label(
                RichText::new(format!(
                    "{} rows for {} at {}",
                    view.row_count, view.selection.product_id, view.selection.store_id
                ))
                .color(Color32::GRAY)
                .small(),
            );
        }
        pick
    }

    fn kpi_row(&self, ui: &mut egui::Ui, metrics: &Result<MetricsSummary, DashboardError>) {
        let m = match metrics {
            Ok(m) => m,
            Err(e) => {
                notice(ui, "No data for this selection", &e.to_string());
                return;
            }
        };

        ui.columns(4, |cols| {
            metric_box(&mut cols[0], "🛒 Latest Sales", &format_latest(m.latest_sales));
            metric_box(&mut cols[1], "💰 Avg. Margin", &format_margin(m.average_margin));
            metric_box(&mut cols[2], "📦 Avg. Out-of-Stock %", &format_pct(m.average_out_of_stock_pct));
            metric_box(&mut cols[3], "📉 Avg. Daily Sales", &format_avg_sales(m.average_sales));
        });
    }
}

impl eframe::App for RetailDashboardApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.heading(
                RichText::new("📊 Retail Forecasting Dashboard")
                    .color(HEADING_COLOR)
                    .strong()
                    .size(26.0),
            );
            ui.add_space(4.0);
        });

        let mut pick = None;
        if self.store.is_loaded() {
            egui::SidePanel::left("filters")
                .min_width(220.0)
                .max_width(320.0)
                .show(ctx, |ui| {
                    pick = self.filter_panel(ui);
                });
        }
        if let Some(pick) = pick {
            self.apply_pick(pick);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(err) = self.load_error.clone() {
                ui.vertical_centered(|ui| {
                    ui.add_space(100.0);
                    ui.label(RichText::new("⚠").size(60.0).color(Color32::from_rgb(200, 80, 80)));
                    ui.add_space(10.0);
                    ui.label(
                        RichText::new("Sales data could not be loaded")
                            .size(20.0)
                            .color(HEADING_COLOR),
                    );
                    ui.label(RichText::new(err).color(Color32::DARK_GRAY));
                    ui.add_space(10.0);
                    if ui.button("🔄 Reload").clicked() {
                        self.load_data();
                    }
                });
                return;
            }

            egui::ScrollArea::vertical().show(ui, |ui| {
                match &self.view {
                    Some(view) => self.kpi_row(ui, &view.metrics),
                    None => notice(ui, "No data", "The dataset has no selectable rows."),
                }

                ui.add_space(16.0);
                section_heading(ui, "📈 Forecast vs Actual Sales");
                match self.view.as_ref().map(|v| &v.forecast) {
                    Some(Ok(series)) => forecast_chart(ui, series, self.model.interval_width()),
                    Some(Err(e)) => notice(ui, "Forecast unavailable", &e.to_string()),
                    None => {}
                }

                if let Some(overview) = &self.overview {
                    ui.add_space(16.0);
                    section_heading(ui, &format!("🏆 Top {} Products by Total Sales", self.config.top_n));
                    bar_chart(
                        ui,
                        "top_products",
                        "Total Sales",
                        overview.top_products.iter().map(|p| (p.product_id.clone(), p.total_sales)).collect(),
                    );

                    ui.add_space(16.0);
                    section_heading(
                        ui,
                        &format!("🏬 Store Sales Comparison (Last {} Days)", self.config.window_days),
                    );
                    bar_chart(
                        ui,
                        "store_sales",
                        &format!("{}-Day Sales", self.config.window_days),
                        overview.store_sales.iter().map(|s| (s.store_id.clone(), s.total_sales)).collect(),
                    );
                }

                ui.add_space(16.0);
                section_heading(ui, "🧾 Forecast Table");
                if let Some(Ok(series)) = self.view.as_ref().map(|v| &v.forecast) {
                    egui::CollapsingHeader::new("📋 View Forecast Data Table").show(ui, |ui| {
                        forecast_table(ui, series);
                    });
                }
            });
        });
    }
}

fn choice_combo(
    ui: &mut egui::Ui,
    id: &str,
    label: &str,
    current: Option<&str>,
    options: &[String],
) -> Option<String> {
    let mut picked = None;
    ui.label(RichText::new(label).strong());
    egui::ComboBox::from_id_salt(id)
        .selected_text(current.unwrap_or("—"))
        .width(200.0)
        .show_ui(ui, |ui| {
            for option in options {
                let selected = current == Some(option.as_str());
                if ui.selectable_label(selected, option.as_str()).clicked() && !selected {
                    picked = Some(option.clone());
                }
            }
        });
    ui.add_space(8.0);
    picked
}

fn section_heading(ui: &mut egui::Ui, text: &str) {
    ui.label(RichText::new(text).size(20.0).strong().color(HEADING_COLOR));
    ui.add_space(4.0);
}

fn notice(ui: &mut egui::Ui, title: &str, detail: &str) {
    egui::Frame::new()
        .fill(Color32::from_rgb(253, 246, 236))
        .stroke(Stroke::new(1.0, Color32::from_rgb(230, 190, 120)))
        .corner_radius(CornerRadius::same(8))
        .inner_margin(Margin::same(12))
        .show(ui, |ui| {
            ui.label(RichText::new(title).strong().color(Color32::from_rgb(140, 90, 20)));
            ui.label(RichText::new(detail).color(Color32::DARK_GRAY));
        });
}

fn metric_box(ui: &mut egui::Ui, title: &str, value: &str) {
    egui::Frame::new()
        .fill(METRIC_FILL)
        .corner_radius(CornerRadius::same(12))
        .inner_margin(Margin::same(10))
        .show(ui, |ui| {
            ui.vertical_centered(|ui| {
                ui.label(RichText::new(title).size(18.0).strong().color(HEADING_COLOR));
                ui.label(RichText::new(value).size(22.0).strong().color(Color32::BLACK));
            });
        });
}

fn day_to_x(date: NaiveDate) -> f64 {
    date.num_days_from_ce() as f64
}

fn x_to_day_label(x: f64) -> String {
    NaiveDate::from_num_days_from_ce_opt(x.round() as i32)
        .map(|d| d.format("%b %d").to_string())
        .unwrap_or_default()
}

fn forecast_chart(ui: &mut egui::Ui, series: &ForecastSeries, interval_width: f64) {
    let band_name = format!("{:.0}% interval", interval_width * 100.0);
    let actual: PlotPoints = series
        .points
        .iter()
        .filter_map(|p| p.actual.map(|a| [day_to_x(p.date), a]))
        .collect();
    let predicted: Vec<[f64; 2]> = series
        .points
        .iter()
        .map(|p| [day_to_x(p.date), p.predicted])
        .collect();
    let upper: PlotPoints = series.points.iter().map(|p| [day_to_x(p.date), p.upper]).collect();
    let lower: PlotPoints = series.points.iter().map(|p| [day_to_x(p.date), p.lower]).collect();
    let cutoff_x = day_to_x(series.cutoff);
    let marker_y = series.max_actual();

    Plot::new("forecast_plot")
        .height(500.0)
        .legend(Legend::default())
        .x_axis_label("Date")
        .y_axis_label("Units Sold")
        .x_axis_formatter(|mark, _range| x_to_day_label(mark.value))
        .show(ui, |plot_ui| {
            plot_ui.line(Line::new("Actual Sales", actual).color(ACTUAL_COLOR).width(2.0));
            plot_ui.line(
                Line::new("Forecast", PlotPoints::from(predicted.clone()))
                    .color(FORECAST_COLOR)
                    .width(1.5),
            );
            plot_ui.points(
                Points::new("Forecast", PlotPoints::from(predicted))
                    .color(FORECAST_COLOR)
                    .radius(2.0),
            );
            plot_ui.line(
                Line::new(band_name.as_str(), upper)
                    .color(BAND_COLOR)
                    .style(LineStyle::dashed_dense()),
            );
            plot_ui.line(
                Line::new(band_name.as_str(), lower)
                    .color(BAND_COLOR)
                    .style(LineStyle::dashed_dense()),
            );
            plot_ui.vline(
                VLine::new("Forecast cutoff", cutoff_x)
                    .color(Color32::RED)
                    .width(2.0)
                    .style(LineStyle::dashed_loose()),
            );
            if let Some(y) = marker_y {
                plot_ui.text(Text::new(
                    "Forecast Starts",
                    PlotPoint::new(cutoff_x, y),
                    RichText::new("Forecast Starts").color(Color32::RED),
                ));
            }
        });
}

fn category_label(labels: &[String], x: f64) -> String {
    let idx = x.round();
    if (x - idx).abs() > 0.01 || idx < 0.0 {
        return String::new();
    }
    labels.get(idx as usize).cloned().unwrap_or_default()
}

fn bar_chart(ui: &mut egui::Ui, id: &str, name: &str, entries: Vec<(String, f64)>) {
    if entries.is_empty() {
        notice(ui, "No data", "Nothing to aggregate.");
        return;
    }

    let bars: Vec<Bar> = entries
        .iter()
        .enumerate()
        .map(|(i, (label, value))| {
            Bar::new(i as f64, *value)
                .name(label)
                .fill(BAR_PALETTE[i % BAR_PALETTE.len()])
                .width(0.6)
        })
        .collect();
    let labels: Vec<String> = entries.into_iter().map(|(label, _)| label).collect();

    Plot::new(id)
        .height(400.0)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .y_axis_label(name)
        .x_axis_formatter(move |mark, _range| category_label(&labels, mark.value))
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(name, bars));
        });
}

fn forecast_table(ui: &mut egui::Ui, series: &ForecastSeries) {
    let rows = series.future_rows();

    TableBuilder::new(ui)
        .striped(true)
        .vscroll(true)
        .max_scroll_height(320.0)
        .column(Column::exact(160.0))
        .column(Column::remainder().at_least(160.0))
        .header(28.0, |mut header| {
            header.col(|ui| {
                ui.strong("Date");
            });
            header.col(|ui| {
                ui.strong("Forecasted Sales");
            });
        })
        .body(|body| {
            body.rows(24.0, rows.len(), |mut row| {
                let p = &rows[row.index()];
                row.col(|ui| {
                    ui.label(p.date.format("%Y-%m-%d").to_string());
                });
                row.col(|ui| {
                    ui.label(format!("{:.2}", p.predicted));
                });
            });
        });
}

pub fn format_latest(value: f64) -> String {
    format!("{value}")
}

pub fn format_margin(value: f64) -> String {
    format!("${value:.2}")
}

pub fn format_pct(value: f64) -> String {
    format!("{value:.1}%")
}

pub fn format_avg_sales(value: f64) -> String {
    format!("{value:.1}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(30.0, "30")]
    #[case(12.5, "12.5")]
    fn latest_sales_prints_as_is(#[case] value: f64, #[case] expected: &str) {
        assert_eq!(format_latest(value), expected);
    }

    #[test]
    fn kpi_formats() {
        assert_eq!(format_margin(3.456), "$3.46");
        assert_eq!(format_pct(7.26), "7.3%");
        assert_eq!(format_avg_sales(20.0), "20.0");
    }

    #[test]
    fn day_axis_round_trips() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        assert_eq!(x_to_day_label(day_to_x(date)), "Jan 03");
    }

    #[test]
    fn category_labels_only_on_integer_ticks() {
        let labels = vec!["P1".to_string(), "P2".to_string()];
        assert_eq!(category_label(&labels, 1.0), "P2");
        assert_eq!(category_label(&labels, 0.5), "");
        assert_eq!(category_label(&labels, -1.0), "");
        assert_eq!(category_label(&labels, 7.0), "");
    }
}
