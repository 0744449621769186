use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sahayak::{logging, ChatSession, EnvConfig, TokenEcho};
use sahayak_api::diagram::{extract_code_blocks, normalize_flowchart};
use sahayak_api::{Assessment, ReadingSample, SahayakClient, StudentQuery};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "sahayak", version, about = "Talk to the Sahayak teaching assistant")]
struct Cli {
    /// Backend origin (overrides SAHAYAK_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Model name for chat (overrides SAHAYAK_MODEL)
    #[arg(long, global = true)]
    model: Option<String>,

    /// Request timeout in seconds (overrides SAHAYAK_TIMEOUT_SECS)
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Stream a reply; without a prompt, read prompts line by line from stdin
    Chat { prompt: Option<String> },
    /// Generate a mermaid flowchart from a description
    Diagram { prompt: String },
    /// Score a reading recording against the passage that was read
    AnalyzeReading {
        /// Recorded audio file
        #[arg(long)]
        audio: PathBuf,
        /// Passage the student was asked to read
        #[arg(long)]
        text: String,
        /// MIME type of the recording
        #[arg(long, default_value = ReadingSample::DEFAULT_MIME_TYPE)]
        mime: String,
    },
    /// Teacher dashboard: student profiles, assessments and meeting prep
    Students {
        #[command(subcommand)]
        command: StudentCommand,
    },
}

#[derive(Subcommand)]
enum StudentCommand {
    /// List students, optionally filtered by grade or teacher
    List {
        #[arg(long)]
        grade: Option<String>,
        #[arg(long, conflicts_with = "grade")]
        teacher_id: Option<String>,
    },
    /// Show one student's full profile
    Show { student_id: String },
    /// Generate talking points and the meeting agenda
    TalkingPoints { student_id: String },
    /// List recent assessments
    Assessments {
        student_id: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Store an assessment given as a JSON object
    AddAssessment {
        student_id: String,
        #[arg(long)]
        json: String,
    },
    /// Generate a parent-teacher meeting summary
    Summary {
        student_id: String,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Download the meeting agenda as text
    Agenda {
        student_id: String,
        /// Write to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = EnvConfig::from_env().with_overrides(cli.base_url, cli.model, cli.timeout_secs);
    logging::init(&config.log_filter);

    let client = SahayakClient::new(config.api_config()).context("failed to build HTTP client")?;

    match cli.command {
        Command::Chat { prompt: Some(prompt) } => {
            let mut session = ChatSession::new(&config.model);
            chat_turn(&client, &mut session, &prompt).await
        }
        Command::Chat { prompt: None } => repl(&client, &config.model).await,
        Command::Diagram { prompt } => {
            let diagram = client
                .generate_diagram(&prompt)
                .await
                .context("diagram generation failed")?;
            println!("{diagram}");
            Ok(())
        }
        Command::AnalyzeReading { audio, text, mime } => {
            let sample = read_sample(&audio, text, mime).await?;
            let analysis = client
                .analyze_reading(&sample)
                .await
                .context("reading analysis failed")?;
            println!("{analysis}");
            Ok(())
        }
        Command::Students { command } => students(&client, command).await,
    }
}

async fn students(client: &SahayakClient, command: StudentCommand) -> Result<()> {
    match command {
        StudentCommand::List { grade, teacher_id } => {
            let query = StudentQuery { grade, teacher_id };
            let students = client
                .list_students(&query)
                .await
                .context("failed to list students")?;
            for student in &students {
                println!(
                    "{}\t{}\tgrade {}",
                    student.student_id,
                    student.personal_info.full_name(),
                    student.personal_info.grade
                );
            }
            Ok(())
        }
        StudentCommand::Show { student_id } => {
            let student = client
                .get_student(&student_id)
                .await
                .with_context(|| format!("failed to load student {student_id}"))?;
            print_json(&student)
        }
        StudentCommand::TalkingPoints { student_id } => {
            let report = client
                .talking_points(&student_id)
                .await
                .context("failed to generate talking points")?;
            match report.agenda_text() {
                Some(agenda) => println!("{}", agenda.trim()),
                None => print_json(&report.talking_points)?,
            }
            Ok(())
        }
        StudentCommand::Assessments { student_id, limit } => {
            let assessments = client
                .list_assessments(&student_id, limit)
                .await
                .context("failed to list assessments")?;
            print_json(&assessments)
        }
        StudentCommand::AddAssessment { student_id, json } => {
            let value: serde_json::Value =
                serde_json::from_str(&json).context("assessment is not valid JSON")?;
            let assessment = Assessment::from_value(value)?;
            let id = client
                .add_assessment(&student_id, &assessment)
                .await
                .context("failed to store assessment")?;
            println!("{id}");
            Ok(())
        }
        StudentCommand::Summary { student_id, notes } => {
            let summary = client
                .meeting_summary(&student_id, &notes)
                .await
                .context("failed to generate meeting summary")?;
            println!("{}", summary.meeting_summary);
            Ok(())
        }
        StudentCommand::Agenda { student_id, output } => {
            let agenda = client
                .download_agenda(&student_id)
                .await
                .context("failed to download agenda")?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, agenda.text.as_bytes())
                        .await
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    eprintln!("agenda written to {}", path.display());
                }
                None => {
                    if let Some(name) = agenda.file_name.as_deref() {
                        eprintln!("({name})");
                    }
                    print!("{}", agenda.text);
                }
            }
            Ok(())
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn chat_turn(client: &SahayakClient, session: &mut ChatSession, prompt: &str) -> Result<()> {
    let request = session.begin_turn(prompt)?;
    let tokens = client
        .stream_generate(&request)
        .await
        .context("failed to start generation")?;

    let mut echo = TokenEcho::new(std::io::stdout());
    let reply = session
        .consume(tokens, |token| echo.write_token(token))
        .await;
    let mut stdout = echo.finish().context("failed to write reply to stdout")?;
    writeln!(stdout).context("failed to write reply to stdout")?;
    let reply = reply.context("generation failed")?;

    for (index, block) in extract_code_blocks(&reply, "mermaid").iter().enumerate() {
        println!("\n[diagram {}]\n{}", index + 1, normalize_flowchart(block));
    }
    Ok(())
}

async fn repl(client: &SahayakClient, model: &str) -> Result<()> {
    let mut session = ChatSession::new(model);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        match line.trim() {
            "" => continue,
            "/exit" | "/quit" => break,
            "/clear" => {
                session.clear();
                eprintln!("(history cleared)");
            }
            prompt => {
                if let Err(error) = chat_turn(client, &mut session, prompt).await {
                    eprintln!("error: {error:#}");
                }
            }
        }
    }
    Ok(())
}

async fn read_sample(path: &Path, text: String, mime: String) -> Result<ReadingSample> {
    let audio = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mut sample = ReadingSample::new(audio, text).with_mime_type(mime);
    if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
        sample = sample.with_file_name(name);
    }
    Ok(sample)
}
