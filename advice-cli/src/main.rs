use std::path::PathBuf;

use advice_client::{
    AdviceApi, AdviceClientHttp, Category, FileSlot, NewAdvice, ProfileUpdate, Registration,
    Session, SessionHub,
};
use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "advice", about = "Command-line client for the advice library")]
struct Cli {
    /// Base address of the advice server.
    #[arg(short, long, env = "ADVICE_SERVER", default_value = "http://127.0.0.1:8080")]
    server: String,

    /// Where the signed-in session is kept between runs.
    #[arg(long, env = "ADVICE_SESSION_FILE", default_value = ".advice_session.json")]
    session_file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Registers an administrator when the key matches the server's.
        #[arg(long)]
        admin_key: Option<String>,
    },
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    Whoami,
    UpdateProfile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        image: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    ListAdvices {
        #[arg(long)]
        category: Option<Category>,
    },
    AddAdvice {
        #[arg(long)]
        category: Category,
        #[arg(long)]
        question: String,
        #[arg(long)]
        answer: String,
        /// Defaults to the signed-in user.
        #[arg(long)]
        author_id: Option<Uuid>,
    },
    /// Creates every entry of a `{"advices": [...]}` JSON file.
    ImportAdvices {
        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(Debug, Deserialize)]
struct ImportFile {
    advices: Vec<NewAdvice>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let hub = SessionHub::new(FileSlot::new(&args.session_file));
    let view = hub.view();
    let stored = view
        .get()
        .await
        .with_context(|| format!("cannot read session file {}", args.session_file.display()))?;
    let client = AdviceClientHttp::connect(&args.server)?.with_session(stored.as_ref());

    match args.command {
        Command::Register {
            name,
            email,
            password,
            admin_key,
        } => {
            let user = client
                .register(Registration {
                    name,
                    email,
                    password,
                    admin_key,
                })
                .await?;
            println!("Registered {user}");
            println!("Run `login` to sign in.");
        }
        Command::Login { email, password } => {
            let session = client.login(&email, &password).await?;
            println!("Signed in as {}", session.user);
            view.set(session).await?;
        }
        Command::Logout => {
            view.clear().await?;
            println!("Signed out.");
        }
        Command::Whoami => match stored {
            Some(Session { user, .. }) => println!("{user}"),
            None => println!("Not signed in."),
        },
        Command::UpdateProfile {
            name,
            email,
            image,
            password,
        } => {
            let Some(mut session) = stored else {
                bail!("not signed in; run `login` first");
            };
            let user = client
                .update_profile(ProfileUpdate {
                    name,
                    email,
                    image,
                    password,
                })
                .await?;
            println!("Profile updated: {user}");
            session.user = user;
            view.set(session).await?;
        }
        Command::ListAdvices { category } => {
            let advices = client.list_advices(category).await?;
            match category {
                Some(category) => println!("Advices in {category} ({})", advices.len()),
                None => println!("Advices ({})", advices.len()),
            }
            for advice in advices {
                println!("{advice}");
            }
        }
        Command::AddAdvice {
            category,
            question,
            answer,
            author_id,
        } => {
            let advice = client
                .create_advice(NewAdvice {
                    category,
                    question,
                    answer,
                    author_id,
                })
                .await?;
            println!("Advice created! ID: {}", advice.id);
        }
        Command::ImportAdvices { file } => {
            let raw = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("cannot read {}", file.display()))?;
            let import: ImportFile = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a valid advice import file", file.display()))?;

            let total = import.advices.len();
            let mut failed = 0;
            for (index, advice) in import.advices.into_iter().enumerate() {
                let question = advice.question.clone();
                match client.create_advice(advice).await {
                    Ok(created) => println!("[{}/{total}] added {}", index + 1, created.id),
                    Err(err) => {
                        failed += 1;
                        eprintln!("[{}/{total}] failed \"{question}\": {err}", index + 1);
                    }
                }
            }
            println!("Imported {} of {total} advices.", total - failed);
            if failed > 0 {
                bail!("{failed} advices could not be imported");
            }
        }
    }

    Ok(())
}
