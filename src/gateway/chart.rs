//! Line-chart URL for `/graph`.

use checkin_core::answer::ValueSeries;

const CHART_BASE: &str = "https://chart.googleapis.com/chart";

/// Build the chart URL for a series.
///
/// Labels are joined with a literal `%7C`; the renderer expects the
/// pipe already encoded.
pub fn chart_url(key: &str, series: &ValueSeries) -> String {
    let values = series
        .values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",");
    let labels = series.times.join("%7C");
    format!(
        "{CHART_BASE}?cht=lc&chd=t:{values}&chs=800x350&chl={labels}&chtt={title}\
         &chf=bg,s,e0e0e0&chco=000000,0000FF&chma=30,30,30,30&chds={min},{max}",
        title = urlencoding::encode(key),
        min = series.minimum.floor() as i64,
        max = series.maximum.ceil() as i64,
    )
}
