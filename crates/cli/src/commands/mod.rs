use clap::Subcommand;
use eyre::{bail, WrapErr};
use warmstash_cache::{FileCache, Ttl};

#[derive(Subcommand)]
pub enum Commands {
    /// Print the JSON value stored under a key
    Get {
        key: String,
    },

    /// Store a JSON value under a key
    Set {
        key: String,

        /// Value as JSON text, e.g. '"text"', '42' or '{"a":1}'
        value: String,

        /// Seconds until the item expires; zero or less deletes it
        #[arg(long, allow_hyphen_values = true)]
        ttl: Option<i64>,
    },

    /// Remove one or more keys
    #[command(visible_alias = "rm")]
    Delete {
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Print whether a live item is stored under a key
    Has {
        key: String,
    },

    /// Remove every item
    Clear,

    /// Remove expired items
    Prune,

    /// Print the file that stores a key
    Path {
        key: String,
    },
}

impl Commands {
    pub fn execute(self, cache: &FileCache) -> eyre::Result<()> {
        match self {
            Commands::Get { key } => match cache.get::<String>(&key)? {
                Some(json) => {
                    println!("{json}");
                    Ok(())
                }
                None => bail!("no live item stored under '{key}'"),
            },
            Commands::Set { key, value, ttl } => {
                let parsed: serde_json::Value = serde_json::from_str(&value)
                    .wrap_err_with(|| format!("value for '{key}' is not valid JSON"))?;

                if cache.set(&key, &parsed.to_string(), ttl.map(Ttl::Seconds))? {
                    tracing::info!("✓ Stored '{key}'");
                } else {
                    tracing::info!("✓ Removed '{key}' (non-positive TTL)");
                }
                Ok(())
            }
            Commands::Delete { keys } => {
                cache.delete_multiple(&keys)?;
                tracing::info!("✓ Removed {} key(s)", keys.len());
                Ok(())
            }
            Commands::Has { key } => {
                println!("{}", cache.has(&key)?);
                Ok(())
            }
            Commands::Clear => {
                cache.clear()?;
                tracing::info!("✓ Cache cleared successfully");
                Ok(())
            }
            Commands::Prune => {
                cache.prune()?;
                tracing::info!("✓ Pruned expired cache entries");
                Ok(())
            }
            Commands::Path { key } => {
                println!("{}", cache.path_for(&key)?.display());
                Ok(())
            }
        }
    }
}
