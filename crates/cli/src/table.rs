use std::io::{self, Write};

use anyhow::Result;
use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};

use spot_core::InstancePrice;

/// Color scheme for table rows.
struct Colors;

impl Colors {
    const BARGAIN: Color = Color::Green;
    const REGULAR: Color = Color::Blue;
    const HEADER: Color = Color::Magenta;
    const DIM: Color = Color::DarkGrey;
}

const HEADERS: [&str; 5] = ["InstanceTypeId", "ZoneId", "Price/Core", "Discount", "Volatility"];

/// Table cells for one ranked row.
fn cells(item: &InstancePrice) -> [String; 5] {
    [
        item.instance_type_id.clone(),
        item.zone_id.clone(),
        format!("{:.5}", item.price_per_core),
        format!("{:.1}", item.discount),
        format!("{:.5}", item.volatility),
    ]
}

fn widths(rows: &[[String; 5]]) -> [usize; 5] {
    let mut widths = HEADERS.map(str::len);
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.len());
        }
    }
    widths
}

fn format_line(cells: &[String; 5], widths: &[usize; 5]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(c, w)| format!("{c:<w$}"))
        .collect::<Vec<_>>()
        .join("  ")
}

/// Print ranked prices, green when the discount is at or below `cutoff`.
pub fn print_table(items: &[InstancePrice], cutoff: f64, conditions: &str) -> Result<()> {
    let rows: Vec<[String; 5]> = items.iter().map(cells).collect();
    let widths = widths(&rows);
    let header = format_line(&HEADERS.map(str::to_string), &widths);

    let mut stdout = io::stdout();
    execute!(
        stdout,
        SetForegroundColor(Colors::HEADER),
        Print(format!("{header}\n")),
        ResetColor,
    )?;
    for (item, row) in items.iter().zip(&rows) {
        let color = if item.discount <= cutoff {
            Colors::BARGAIN
        } else {
            Colors::REGULAR
        };
        execute!(
            stdout,
            SetForegroundColor(color),
            Print(format!("{}\n", format_line(row, &widths))),
            ResetColor,
        )?;
    }
    execute!(
        stdout,
        SetForegroundColor(Colors::DIM),
        Print(format!("{} offerings ({})\n", items.len(), conditions)),
        ResetColor,
    )?;
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, ppc: f64) -> InstancePrice {
        InstancePrice {
            instance_type_id: id.to_string(),
            zone_id: "cn-hangzhou-b".to_string(),
            core_count: 4,
            memory_gib: 8.0,
            price_per_core: ppc,
            spot_price: ppc * 4.0,
            origin_price: 1.0,
            discount: 1.23,
            volatility: 0.5,
        }
    }

    #[test]
    fn cells_use_fixed_precision() {
        let row = cells(&item("ecs.c5.xlarge", 0.0312345));
        assert_eq!(row[2], "0.03123");
        assert_eq!(row[3], "1.2");
    }

    #[test]
    fn columns_pad_to_widest_cell() {
        let rows = vec![cells(&item("ecs.c5.xlarge", 0.03)), cells(&item("ecs.c6.16xlarge", 0.04))];
        let widths = widths(&rows);
        assert_eq!(widths[0], "ecs.c6.16xlarge".len());
        assert_eq!(widths[1], "cn-hangzhou-b".len());
        let line = format_line(&rows[0], &widths);
        assert!(line.starts_with("ecs.c5.xlarge    cn-hangzhou-b"));
    }
}
