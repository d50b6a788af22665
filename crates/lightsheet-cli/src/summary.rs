use console::Style;
use lightsheet_core::pipeline::config::RegistrationMethod;
use lightsheet_core::pipeline::Job;
use lightsheet_core::report::{FusionSummary, Report};
use lightsheet_core::resources::format_bytes;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
    ok: Style,
    failed: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
            ok: Style::new().green().bold(),
            failed: Style::new().red().bold(),
        }
    }
}

fn on_off(s: &Styles, enabled: bool) -> String {
    if enabled {
        s.value.apply_to("yes").to_string()
    } else {
        s.disabled.apply_to("no").to_string()
    }
}

pub fn print_job_summary(job: &Job) {
    let s = Styles::new();
    let c = &job.config;

    println!();
    println!("  {}", s.title.apply_to("Lightsheet Pipeline"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(19)));
    println!();

    println!(
        "  {:<16}{}",
        s.label.apply_to("Input"),
        s.path.apply_to(job.input.display())
    );
    println!(
        "  {:<16}{}",
        s.label.apply_to("Reader"),
        s.method.apply_to(c.reader)
    );
    println!();

    // Registration
    println!("  {}", s.header.apply_to("Registration"));
    println!(
        "    {:<14}{}",
        s.label.apply_to("Method"),
        s.method.apply_to(&c.registration)
    );
    if let RegistrationMethod::InterestPoints(params) = &c.registration {
        println!(
            "    {:<14}{}",
            s.label.apply_to("Detections"),
            s.value.apply_to(params.max_detections)
        );
    }
    println!(
        "    {:<14}{}",
        s.label.apply_to("Best side"),
        on_off(&s, c.autoselect_illumination)
    );
    println!();

    // Fusion
    if c.fuse {
        println!("  {}", s.header.apply_to("Fusion"));
        println!(
            "    {:<14}{}",
            s.label.apply_to("Downsample"),
            s.value.apply_to(format!("{}x", c.downsampling))
        );
        println!(
            "    {:<14}{}",
            s.label.apply_to("Slow fusion"),
            s.value.apply_to(c.resources.slow_fusion)
        );
        if let Some(free) = c.resources.free_memory_override {
            println!(
                "    {:<14}{}",
                s.label.apply_to("Free memory"),
                s.value.apply_to(format_bytes(free))
            );
        }
        println!(
            "    {:<14}{}",
            s.label.apply_to("Convert"),
            if c.convert_to_final_format {
                s.method.apply_to(&c.converter.output_format).to_string()
            } else {
                s.disabled.apply_to("no").to_string()
            }
        );
    } else {
        println!(
            "  {:<16}{}",
            s.header.apply_to("Fusion"),
            s.disabled.apply_to("disabled")
        );
    }
    println!();

    println!(
        "  {:<16}{}",
        s.label.apply_to("Delete temp"),
        on_off(&s, c.delete_intermediate)
    );
    println!(
        "  {:<16}{}",
        s.label.apply_to("Notify"),
        match c.notification_recipient() {
            Some(target) => s.value.apply_to(target).to_string(),
            None => s.disabled.apply_to("none").to_string(),
        }
    );
    println!();
}

pub fn print_report(report: &Report) {
    let s = Styles::new();

    println!();
    if let Some(FusionSummary { estimate, mode }) = &report.fusion {
        let mode = match mode {
            Some((strategy, output)) => s
                .method
                .apply_to(format!("{strategy} ({output})"))
                .to_string(),
            None => s.disabled.apply_to("skipped").to_string(),
        };
        println!(
            "  {:<16}{} {}",
            s.label.apply_to("Fusion"),
            mode,
            s.label.apply_to(format!(
                "[{} tier, {} free]",
                estimate.tier,
                format_bytes(estimate.free_memory_bytes)
            ))
        );
    }
    println!(
        "  {:<16}{}",
        s.label.apply_to("Notification"),
        s.value.apply_to(&report.notification)
    );
    println!(
        "  {:<16}{}",
        s.label.apply_to("Total"),
        s.value.apply_to(format!("{} min", report.total_minutes()))
    );
    let outcome = if report.succeeded() {
        s.ok.apply_to(report.outcome.to_string())
    } else {
        s.failed.apply_to(report.outcome.to_string())
    };
    println!("  {:<16}{}", s.label.apply_to("Outcome"), outcome);
    println!();
}
