use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use microdrop::device::DmfDevice;
use microdrop::experiment_log::{column_names, LogRow, LogSummary};
use microdrop::view::{ElectrodeState, RenderPlan};

fn state_cell(state: Option<ElectrodeState>) -> Cell {
    match state {
        Some(ElectrodeState::AllOn) => Cell::new("on").fg(Color::White),
        Some(ElectrodeState::AllOff) => Cell::new("off").fg(Color::Blue),
        Some(ElectrodeState::Mixed) => Cell::new("mixed").fg(Color::Yellow),
        Some(ElectrodeState::Unassigned) => Cell::new("unassigned").fg(Color::Red),
        None => Cell::new("-"),
    }
}

pub fn print_electrode_table(device: &DmfDevice, plan: &RenderPlan) {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Id").add_attribute(Attribute::Bold),
        Cell::new("X"),
        Cell::new("Y"),
        Cell::new("W"),
        Cell::new("H"),
        Cell::new(if device.scale.is_some() { "Area (mm²)" } else { "Area (u²)" }),
        Cell::new("Channels"),
        Cell::new("State").add_attribute(Attribute::Bold),
    ]);

    for i in 1..=5 {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }

    for e in device.geometry.electrodes() {
        let area = e.area() as f64 * device.scale.unwrap_or(1.0);
        let channels = e
            .channels
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(",");
        table.add_row(vec![
            Cell::new(e.id).add_attribute(Attribute::Bold),
            Cell::new(format!("{:.2}", e.x)),
            Cell::new(format!("{:.2}", e.y)),
            Cell::new(format!("{:.2}", e.width)),
            Cell::new(format!("{:.2}", e.height)),
            Cell::new(format!("{:.3}", area)),
            Cell::new(channels),
            state_cell(plan.state_of(e.id)),
        ]);
    }
    println!("{}", table);
}

pub fn print_render_summary(plan: &RenderPlan) {
    println!(
        "🎨 off: {} | on: {} | unassigned: {} | mixed: {}",
        plan.off.len(),
        plan.on.len(),
        plan.unassigned.len(),
        plan.mixed.len()
    );
    if !plan.mixed.is_empty() {
        println!("⚠️  Mixed channel states (not drawn): {:?}", plan.mixed);
    }
}

pub fn print_log_summary(id: u32, summary: &LogSummary) {
    println!("\n=== Experiment {} ===", id);
    println!("{}", summary.software_version);
    println!("{}", summary.device);
    println!("{}", summary.protocol);
    println!("{}", summary.control_board);
    println!("{}", summary.experiment_time);
    if !summary.notes.is_empty() {
        println!("Notes: {}", summary.notes);
    }
}

pub fn print_log_rows(rows: &[LogRow]) {
    if rows.is_empty() {
        println!("(no step records)");
        return;
    }
    let mut table = Table::new();
    table.load_preset(ASCII_FULL);
    table.set_header(column_names());
    for row in rows {
        table.add_row(
            row.cells()
                .into_iter()
                .map(|s| Cell::new(s).set_alignment(CellAlignment::Right)),
        );
    }
    println!("{}", table);
}
