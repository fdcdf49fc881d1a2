use anyhow::Result;
use clap::{Parser, Subcommand};
use rastreando_admin::{AdminClient, import, models::DEFAULT_SERVER};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Base URL of the Rastreando server
    #[arg(long, global = true, default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an administrator account
    SignUp {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Sign in and print the id token
    SignIn {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    ResetPassword {
        #[arg(long)]
        email: String,
    },

    /// List the neoplasias available for a sex
    Neoplasias {
        #[arg(long)]
        sexo: String,
    },

    /// Print the aggregated content for a kind
    Show {
        kind: String,
        #[arg(long)]
        sexo: String,
        #[arg(long)]
        neoplasia: Option<String>,
    },

    /// Bulk-save a JSON bundle of content entries
    Import {
        #[arg(long)]
        token: String,
        file: std::path::PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let client = AdminClient::new(&args.server)?;

    match args.command {
        Command::SignUp {
            name,
            email,
            password,
        } => {
            let admin = client.sign_up(&name, &email, &password).await?;
            println!("{}", serde_json::to_string_pretty(&admin)?);
        }
        Command::SignIn { email, password } => {
            let session = client.sign_in(&email, &password).await?;
            eprintln!("Signed in as {} ({})", session.email, session.uid);
            println!("{}", session.id_token);
        }
        Command::ResetPassword { email } => {
            client.reset_password(&email).await?;
            println!("Password reset email sent to {email}");
        }
        Command::Neoplasias { sexo } => {
            for option in client.neoplasias(&sexo).await? {
                println!("{:<16} {}", option.value, option.label);
            }
        }
        Command::Show {
            kind,
            sexo,
            neoplasia,
        } => {
            let content = client.show(&kind, &sexo, neoplasia.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&content)?);
        }
        Command::Import { token, file } => {
            let bundle = tokio::fs::read_to_string(&file).await?;
            let written = import(&client, &token, &bundle).await?;
            println!("\nDocuments Written: {written}");
        }
    }

    Ok(())
}
