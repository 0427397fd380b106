use std::path::PathBuf;
use clap::Parser;
use log::{debug, error};
use tokio::io::{AsyncBufReadExt, BufReader};

use claude_client::app::{render, App};
use claude_client::client::AnthropicFactory;
use claude_client::config::AppConfig;
use claude_client::form::FieldKey;
use claude_client::store::JsonFileStore;

#[derive(Parser)]
#[command(name = "claude-client")]
#[command(about = "Terminal prompt form for the Anthropic Messages API", long_about = None)]
struct Cli
{   /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>
  , /// Field store file (defaults to the platform config dir)
    #[arg(long)]
    store: Option<PathBuf>
  , /// Override the API base URL
    #[arg(long)]
    api_base: Option<String>
  , /// Request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>
  , /// Do not show the example response before the first submission
    #[arg(long)]
    no_example: bool
}

const HELP: &str = "\
Commands:
  :token <key>          set the API token (stored locally)
  :prompt <text>        edit the prompt (use \\n for newlines)
  :system <text>        edit the system prompt
  :model <id>           edit the model
  :max-tokens <n>       edit max output tokens
  :temperature <t>      edit temperature, -1 to 1
  :submit               submit (an empty line does the same)
  :fields               show draft values
  :show / :full         show the response / with full JSON
  :help  :quit";

/// Text for a field edit: multi-line fields keep their spacing and
/// take `\n` escapes, single-line fields drop leading blanks
fn field_text(field: FieldKey, arg: &str) -> String
{   match field
    {   FieldKey::Prompt | FieldKey::SystemPrompt => {
          arg.replace("\\n", "\n")
        }
      , _ => arg.trim_start().to_string()
    }
}

fn print_fields<S, F>(app: &App<S, F>)
where
  S: claude_client::store::FieldStore,
  F: claude_client::client::ClientFactory,
{   let form = app.form();
    for key in FieldKey::ALL
    {   let value = if key == FieldKey::Credential && !form.credential().is_empty()
        {   "********".to_string()
        } else
        {   form.draft_text(key)
        };
        println!("{:>12}: {}", key.name(), value);
    }
    if !app.submit_enabled()
    {   println!("Prompt, system prompt, and token required to submit.");
    }
}

#[tokio::main]
async fn main()
{   env_logger::Builder::from_env(
      env_logger::Env::default().default_filter_or("warn")
    ).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await
    {   error!("{}", e);
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), claude_client::error::Error>
{   let mut config = match &cli.config
    {   Some(path) => AppConfig::load(path)?
      , None => AppConfig::default()
    };
    if let Some(store) = cli.store
    {   config.store_path = Some(store);
    }
    if let Some(api_base) = cli.api_base
    {   config.provider.api_base = api_base;
    }
    if cli.timeout_secs.is_some()
    {   config.provider.timeout_secs = cli.timeout_secs;
    }
    if cli.no_example
    {   config.example_on_first_load = false;
    }
    debug!("Config: {:?}", config);

    let store = JsonFileStore::open(config.resolved_store_path()?)?;
    let factory = AnthropicFactory::new(config.provider.clone());
    let mut app = App::new(store, factory, config.example_on_first_load);

    println!("{}", HELP);
    print_fields(&app);
    print!("{}", render(&app.view(), false));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop
    {   let waiting = app.view().is_pending;
        tokio::select!
        {   line = lines.next_line() => {
              let line = match line.map_err(|e| {
                claude_client::error::Error::Other(format!("stdin: {}", e))
              })?
              {   Some(line) => line
                , None => break
              };
              let line = line.trim_end();
              let (cmd, arg) = match line.split_once(' ')
              {   Some((cmd, arg)) => (cmd, arg)
                , None => (line, "")
              };
              match cmd
              {   "" | ":submit" => {
                    if app.submit().is_none()
                    {   println!("Prompt, system prompt, and token required to submit.");
                    }
                    print!("{}", render(&app.view(), false));
                  }
                , ":show" => print!("{}", render(&app.view(), false))
                , ":full" => print!("{}", render(&app.view(), true))
                , ":fields" => print_fields(&app)
                , ":help" => println!("{}", HELP)
                , ":quit" | ":q" => break
                , other => {
                    match other.strip_prefix(':').map(str::parse::<FieldKey>)
                    {   Some(Ok(field)) => {
                          if let Err(e) = app.edit_field(field, &field_text(field, arg))
                          {   println!("{}", e);
                          }
                          if field == FieldKey::Credential
                          {   print!("{}", render(&app.view(), false));
                          }
                        }
                      , _ => println!("Unknown command: {}", other)
                    }
                  }
              }
            }
          , _ = app.settle(), if waiting => {
              print!("{}", render(&app.view(), false));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn single_line_fields_drop_leading_blanks()
    {   assert_eq!(field_text(FieldKey::Credential, "  sk-x"), "sk-x");
        assert_eq!(field_text(FieldKey::Model, " claude-3-haiku"), "claude-3-haiku");
        assert_eq!(field_text(FieldKey::MaxTokens, "   64"), "64");
        assert_eq!(field_text(FieldKey::Temperature, "\t0.5"), "0.5");
    }

    #[test]
    fn multi_line_fields_keep_text_and_expand_newlines()
    {   assert_eq!(field_text(FieldKey::Prompt, " a\\nb"), " a\nb");
        assert_eq!(field_text(FieldKey::SystemPrompt, "haiku\\nonly"), "haiku\nonly");
    }
}
