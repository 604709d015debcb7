use std::io::{self, Write};

use capacity_planner::calculations::pi_history_label;
use capacity_planner::persistence::{
    load_capabilities_from_csv, load_roster_from_csv, load_velocity_from_csv,
    load_workbook_from_json, save_roster_to_csv, save_workbook_to_json,
};
use capacity_planner::{
    EstimationApproach, MemberStatus, PlanningWorkbook, RoleRelevanceMap, SprintCalendar,
    TeamPiRecord,
};
use chrono::NaiveDate;
use polars::prelude::{AnyValue, Column, DataFrame};
use tracing_subscriber::EnvFilter;

fn render_cell(col: &Column, row_idx: usize) -> String {
    match col.get(row_idx) {
        Ok(AnyValue::Null) | Err(_) => String::new(),
        Ok(AnyValue::Float64(v)) => format!("{v:.2}"),
        Ok(AnyValue::String(s)) => s.to_string(),
        Ok(AnyValue::List(inner)) => match inner.f64() {
            Ok(ca) => ca
                .into_iter()
                .flatten()
                .map(|v| format!("{v}"))
                .collect::<Vec<_>>()
                .join(","),
            Err(_) => inner.to_string(),
        },
        Ok(av) => av.to_string(),
    }
}

fn render_df_as_text_table(df: &DataFrame) -> String {
    let columns = df.get_columns();
    let col_names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();
    let cells: Vec<Vec<String>> = (0..df.height())
        .map(|row_idx| columns.iter().map(|col| render_cell(col, row_idx)).collect())
        .collect();

    let mut widths: Vec<usize> = col_names.iter().map(|n| n.len()).collect();
    for row in &cells {
        for (ci, cell) in row.iter().enumerate() {
            widths[ci] = widths[ci].max(cell.len());
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let render_row = |values: &[String]| {
        let mut line = String::from("|");
        for (ci, value) in values.iter().enumerate() {
            line.push(' ');
            line.push_str(value);
            line.push_str(&" ".repeat(widths[ci].saturating_sub(value.len())));
            line.push_str(" |");
        }
        line
    };

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&render_row(&col_names));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in &cells {
        out.push_str(&render_row(row));
        out.push('\n');
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn print_help() {
    println!(
        "Commands:\n  help                               Show this help\n  use <team> <pi>                    Select team and PI (e.g. use Falcon 24-01)\n  show                               Show members of the selected team and PI\n  add <name> <role>                  Add member with default hours and FTE\n  fte <name> <float>                 Set FTE (0..1)\n  hours <name> <float>               Set business hours per day\n  daysoff <name> <csv>               Set days off per sprint (e.g. 0,1,0,2,0)\n  focus <name> <float>               Set SP focus factor\n  status <name> <status>             Set Onboarding|Offboarding|Active and its multiplier\n  mult <name> <float>                Set multiplier\n  remove <name>                      Delete member\n  role <role> <true|false>           Set role relevance\n  roles                              Show role relevance\n  approach <velocity|percentages>    Set the team's estimation approach\n  record <avg_velocity> <members>    Save velocity record and propagate focus factor\n  suggest [members]                  Suggest velocity record from history\n  capacity                           Show capacity report\n  overview                           Capacity of every team in the PI\n  copy <target_pi> [overwrite]       Copy members to another PI with days off reset\n  settings                           Show planning settings\n  calendar <YYYY-MM-DD> <weeks> <n>  Lay out sprints and set sprint duration\n  set <key> <value>                  Change a planning setting\n  capabilities [area]                List capabilities tagged with the PI\n  alignment [area]                   Review capability budgets\n  save json <path>                   Save workbook\n  load json <path>                   Load workbook\n  import <roster|velocity|capabilities> <path>\n                                     Import a CSV sheet\n  export roster <path>               Export roster CSV\n  quit|exit                          Exit"
    );
}

fn show_members(workbook: &PlanningWorkbook, team: &str, pi: &str) {
    match workbook.roster().frame_for(team, pi) {
        Ok(df) => println!("{}", render_df_as_text_table(&df)),
        Err(e) => println!("Error: {}", e),
    }
}

/// Apply `edit` to one member of the selected team and PI and save it back.
fn edit_member<F>(workbook: &mut PlanningWorkbook, team: &str, pi: &str, name: &str, edit: F)
where
    F: FnOnce(&mut capacity_planner::TeamMember),
{
    let member = match workbook.roster().member(team, pi, name) {
        Ok(Some(member)) => member,
        Ok(None) => {
            println!("Member '{}' not found.", name);
            return;
        }
        Err(e) => {
            println!("Error: {}", e);
            return;
        }
    };
    let mut member = member;
    edit(&mut member);
    match workbook.upsert_member(team, pi, member) {
        Ok(()) => {
            println!("Member '{}' updated.", name);
            show_members(workbook, team, pi);
        }
        Err(e) => println!("Error: {}", e),
    }
}

fn parse_f64_list(s: &str) -> Option<Vec<f64>> {
    s.split(',').map(|p| p.trim().parse::<f64>().ok()).collect()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let mut workbook = match std::env::args().nth(1) {
        Some(path) => match load_workbook_from_json(&path) {
            Ok(workbook) => workbook,
            Err(e) => {
                eprintln!("Could not load {}: {}", path, e);
                PlanningWorkbook::new()
            }
        },
        None => PlanningWorkbook::new(),
    };
    let mut context: Option<(String, String)> = None;

    println!("Capacity Planner (CLI) - type 'help' for commands\n");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "use" => match (parts.next(), parts.next()) {
                (Some(team), Some(pi)) => {
                    println!("Selected team {} for PI {}.", team, pi);
                    context = Some((team.to_string(), pi.to_string()));
                }
                _ => println!("Usage: use <team> <pi>"),
            },
            "settings" => match serde_json::to_string_pretty(workbook.settings()) {
                Ok(json) => println!("{}", json),
                Err(e) => println!("Error: {}", e),
            },
            "set" => match (parts.next(), parts.next()) {
                (Some(key), Some(value)) => match workbook.update_setting(key, value) {
                    Ok(()) => println!("{} set to {}.", key, value),
                    Err(e) => println!("Error: {}", e),
                },
                _ => println!("Usage: set <key> <value>"),
            },
            "calendar" => {
                let start = parts
                    .next()
                    .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());
                let weeks = parts.next().and_then(|s| s.parse::<u32>().ok());
                let sprints = parts.next().and_then(|s| s.parse::<usize>().ok());
                let (Some(start), Some(weeks), Some(sprints)) = (start, weeks, sprints) else {
                    println!("Usage: calendar <YYYY-MM-DD> <weeks> <sprints>");
                    continue;
                };
                let calendar = SprintCalendar::new(start, weeks, sprints);
                let windows = match calendar.sprints() {
                    Ok(windows) => windows,
                    Err(e) => {
                        println!("Error: {}", e);
                        continue;
                    }
                };
                for sprint in windows {
                    println!(
                        "Sprint {}: {} - {} ({} working days)",
                        sprint.number, sprint.start, sprint.end, sprint.working_days
                    );
                }
                match workbook.apply_sprint_calendar(&calendar) {
                    Ok(()) => println!(
                        "Sprint duration set to {:.1} days over {} sprints.",
                        workbook.settings().sprint_duration,
                        workbook.settings().num_sprints
                    ),
                    Err(e) => println!("Error: {}", e),
                }
            }
            "save" | "load" => {
                let kind = parts.next();
                let path = parts.next();
                match (kind, path) {
                    (Some("json"), Some(path)) if cmd == "save" => {
                        match save_workbook_to_json(&workbook, path) {
                            Ok(()) => println!("Workbook saved to {}.", path),
                            Err(e) => println!("Error: {}", e),
                        }
                    }
                    (Some("json"), Some(path)) => match load_workbook_from_json(path) {
                        Ok(loaded) => {
                            workbook = loaded;
                            println!("Workbook loaded from {}.", path);
                        }
                        Err(e) => println!("Error: {}", e),
                    },
                    _ => println!("Usage: {} json <path>", cmd),
                }
            }
            "import" => match (parts.next(), parts.next()) {
                (Some("roster"), Some(path)) => match load_roster_from_csv(path) {
                    Ok(roster) => {
                        println!("Imported {} members.", roster.len());
                        workbook.replace_roster(roster);
                    }
                    Err(e) => println!("Error: {}", e),
                },
                (Some("velocity"), Some(path)) => match load_velocity_from_csv(path) {
                    Ok(history) => {
                        println!("Imported {} velocity rows.", history.len());
                        workbook.replace_velocity_history(history);
                    }
                    Err(e) => println!("Error: {}", e),
                },
                (Some("capabilities"), Some(path)) => {
                    match load_capabilities_from_csv(path)
                        .map_err(|e| e.to_string())
                        .and_then(|caps| {
                            let count = caps.len();
                            workbook
                                .replace_capabilities(caps)
                                .map(|()| count)
                                .map_err(|e| e.to_string())
                        }) {
                        Ok(count) => println!("Imported {} capabilities.", count),
                        Err(e) => println!("Error: {}", e),
                    }
                }
                _ => println!("Usage: import <roster|velocity|capabilities> <path>"),
            },
            "export" => match (parts.next(), parts.next()) {
                (Some("roster"), Some(path)) => match save_roster_to_csv(workbook.roster(), path) {
                    Ok(()) => println!("Roster exported to {}.", path),
                    Err(e) => println!("Error: {}", e),
                },
                _ => println!("Usage: export roster <path>"),
            },
            _ => {
                let Some((team, pi)) = context.clone() else {
                    println!("Unknown command or no team selected. Type 'help'.");
                    continue;
                };
                run_team_command(&mut workbook, &team, &pi, cmd, parts.collect());
            }
        }
    }
}

fn run_team_command(workbook: &mut PlanningWorkbook, team: &str, pi: &str, cmd: &str, args: Vec<&str>) {
    match (cmd, args.as_slice()) {
        ("show", _) => show_members(workbook, team, pi),
        ("add", [name, role]) => {
            let member = workbook.new_team_member(team, pi, *name, *role);
            match workbook.upsert_member(team, pi, member) {
                Ok(()) => {
                    println!("Member '{}' added.", name);
                    show_members(workbook, team, pi);
                }
                Err(e) => println!("Error: {}", e),
            }
        }
        ("add", _) => println!("Usage: add <name> <role>"),
        ("fte" | "hours" | "focus" | "mult", [name, value]) => {
            let Ok(value) = value.parse::<f64>() else {
                println!("Invalid float");
                return;
            };
            edit_member(workbook, team, pi, name, |member| match cmd {
                "fte" => member.fte = value,
                "hours" => member.hours = value,
                "focus" => member.sp_focus_factor = value,
                _ => member.multiplier = value,
            });
        }
        ("fte" | "hours" | "focus" | "mult", _) => println!("Usage: {} <name> <float>", cmd),
        ("daysoff", [name, csv]) => {
            let Some(days_off) = parse_f64_list(csv) else {
                println!("Invalid days off list");
                return;
            };
            edit_member(workbook, team, pi, name, |member| member.days_off = days_off);
        }
        ("daysoff", _) => println!("Usage: daysoff <name> <csv>"),
        ("status", [name, status]) => match status.parse::<MemberStatus>() {
            Ok(status) => edit_member(workbook, team, pi, name, |member| {
                member.status = status;
                member.multiplier = status.default_multiplier();
            }),
            Err(e) => println!("Error: {}", e),
        },
        ("status", _) => println!("Usage: status <name> <Onboarding|Offboarding|Active>"),
        ("remove", [name]) => match workbook.delete_member(team, pi, name) {
            Ok(()) => println!("Deleted member '{}'.", name),
            Err(e) => println!("Error: {}", e),
        },
        ("remove", _) => println!("Usage: remove <name>"),
        ("role", [role, relevant]) => {
            let relevant = match relevant.to_ascii_lowercase().as_str() {
                "true" => true,
                "false" => false,
                _ => {
                    println!("Invalid bool (true|false)");
                    return;
                }
            };
            let mut roles = workbook.roles(team, pi);
            roles.set(*role, relevant);
            workbook.replace_roles(team, pi, roles);
            println!("Role '{}' relevant: {}.", role, relevant);
        }
        ("role", _) => println!("Usage: role <role> <true|false>"),
        ("roles", _) => print_roles(&workbook.roles(team, pi)),
        ("approach", [approach]) => match approach.parse::<EstimationApproach>() {
            Ok(approach) => {
                let mut record = workbook
                    .team_record(team, pi)
                    .cloned()
                    .unwrap_or_else(|| TeamPiRecord::new(team, pi, approach));
                record.approach = approach;
                record.sp_conversion = workbook.settings().sp_conversion;
                match workbook.upsert_team_record(record) {
                    Ok(_) => println!("Approach set to {}.", approach),
                    Err(e) => println!("Error: {}", e),
                }
            }
            Err(e) => println!("Error: {}", e),
        },
        ("approach", _) => println!("Usage: approach <velocity|percentages>"),
        ("record", [velocity, members]) => {
            let (Ok(velocity), Ok(members)) = (velocity.parse::<f64>(), members.parse::<u32>())
            else {
                println!("Usage: record <avg_velocity> <members>");
                return;
            };
            let mut record = TeamPiRecord::new(team, pi, EstimationApproach::Velocity);
            record.average_velocity = velocity;
            record.average_duration = workbook.settings().sprint_duration;
            record.average_team_members = members;
            record.sp_conversion = workbook.settings().sp_conversion;
            record.recompute_focus_factor();
            let focus = record.sp_focus_factor;
            match workbook.upsert_team_record(record) {
                Ok(updated) => println!(
                    "SP focus factor {:.2}% applied to {} members.",
                    focus * 100.0,
                    updated
                ),
                Err(e) => println!("Error: {}", e),
            }
        }
        ("record", _) => println!("Usage: record <avg_velocity> <members>"),
        ("suggest", rest) => {
            let members = match rest.first().map(|s| s.parse::<u32>()) {
                None => None,
                Some(Ok(members)) => Some(members),
                Some(Err(_)) => {
                    println!("Invalid member count");
                    return;
                }
            };
            match workbook.suggest_velocity_record(team, pi, members) {
                Ok((record, baseline)) => println!(
                    "{}\nAverage velocity {:.2}, SP focus factor {:.2}%",
                    baseline.summary(),
                    record.average_velocity,
                    record.sp_focus_factor * 100.0
                ),
                Err(e) => println!("Error: {}", e),
            }
        }
        ("capacity", _) => match workbook.capacity_report(team, pi) {
            Ok(report) => {
                println!("{}", report.headline());
                for table in [
                    report.member_table(),
                    report.sprint_breakdown(),
                    report.role_breakdown(),
                ] {
                    match table {
                        Ok(df) => println!("{}", render_df_as_text_table(&df)),
                        Err(e) => println!("Error: {}", e),
                    }
                }
            }
            Err(e) => println!("Error: {}", e),
        },
        ("overview", _) => match workbook.pi_overview(pi) {
            Ok(rows) => {
                for row in rows {
                    println!(
                        "{:<20} {:<12} {:>3} members {:>8.1} SP {:>8.1} SP buffered",
                        row.team,
                        row.approach.as_str(),
                        row.members,
                        row.pi_total,
                        row.pi_total_buffered
                    );
                }
            }
            Err(e) => println!("Error: {}", e),
        },
        ("copy", [target]) | ("copy", [target, _]) => {
            let overwrite = args.get(1) == Some(&"overwrite");
            match workbook.copy_pi(team, pi, target, overwrite) {
                Ok(copied) => println!("Copied {} members to PI {}.", copied, target),
                Err(e) => println!("Error: {}", e),
            }
        }
        ("copy", _) => println!("Usage: copy <target_pi> [overwrite]"),
        ("capabilities", rest) => {
            let area = rest.first().copied().unwrap_or("");
            for capability in workbook.capabilities_for(&pi_history_label(pi), area) {
                println!(
                    "{:<8} {:<40} {:<16} {:>6.1}/{:<6.1} {}",
                    capability.id,
                    capability.title,
                    capability.state_label(),
                    capability.total_pi_sp(),
                    capability.budget_sp,
                    capability.budget_status().as_str()
                );
            }
        }
        ("alignment", rest) => {
            let area = rest.first().copied().unwrap_or("");
            println!("{:?}", workbook.review_alignment(&pi_history_label(pi), area));
        }
        _ => println!("Unknown command. Type 'help'."),
    }
}

fn print_roles(roles: &RoleRelevanceMap) {
    if roles.is_empty() {
        println!("No role relevance set.");
        return;
    }
    for (role, relevant) in roles.entries() {
        println!("{:<24} {}", role, relevant);
    }
}
