use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::*;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::{
    backend::{Backend, Bucket, supabase::SupabaseBackend},
    config::Config,
    models::{
        filter::{apply_filters, state_from_selections},
        project::Project,
        session::Session,
        tag::FILTER_CATEGORIES,
        upload::UploadFile,
    },
    services::{
        auth::{AuthError, SignInError, SignInParameters, current_admin, sign_in, sign_out},
        patterns::pattern_download_url,
        projects::{
            CreateProjectError, CreateProjectParameters, DeleteProjectError,
            DeleteProjectParameters, GetProjectError, UpdateProjectError,
            UpdateProjectParameters, create_project, delete_project, get_project, list_projects,
            update_project,
        },
    },
    session::{SessionStore, json::JsonSessionStore},
};

mod backend;
mod config;
mod models;
mod server;
mod services;
mod session;
mod ui;

#[derive(Parser)]
#[command(
    name = "stitch",
    about = "A gallery of handmade crochet projects, with an admin side for curating it"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse the gallery (default)
    Explore {
        /// Narrow by a tag such as "type:amigurumi" (can be used multiple times)
        #[arg(short, long, action = clap::ArgAction::Append)]
        filter: Vec<String>,

        /// Drop every selection in a category, e.g. "type"
        #[arg(short, long, action = clap::ArgAction::Append)]
        clear: Vec<String>,
    },

    /// List every filter category and its options
    Filters,

    /// List all tags in use
    Tags,

    /// Show a single project
    Show {
        /// Project ID
        id: Uuid,
    },

    /// Print a temporary download link for a project's pattern
    Pattern {
        /// Project ID
        id: Uuid,
    },

    /// Sign in as the gallery admin
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },

    /// Sign out and forget the local session
    Logout,

    /// Show who is signed in
    Whoami,

    /// Manage projects (requires sign-in)
    #[command(subcommand)]
    Admin(AdminCommands),

    /// Serve the pattern download API
    Serve {
        /// Port to listen on, overrides STITCH_PORT
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// List all projects
    List,

    /// Add a new project
    New {
        /// Project name
        #[arg(short, long)]
        name: String,

        /// Longer description
        #[arg(short, long)]
        description: Option<String>,

        /// Comma-separated tags, e.g. "type:bag, skill:easy, gift"
        #[arg(short, long, default_value = "")]
        tags: String,

        /// Photo of the finished piece
        #[arg(short, long)]
        image: PathBuf,

        /// Pattern PDF
        #[arg(short, long)]
        pattern: Option<PathBuf>,
    },

    /// Edit a project; omitted fields keep their current value
    Edit {
        /// Project ID
        id: Uuid,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        /// Comma-separated tags, replaces the current set
        #[arg(short, long)]
        tags: Option<String>,

        /// Replacement photo
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// Replacement pattern PDF
        #[arg(short, long)]
        pattern: Option<PathBuf>,
    },

    /// Delete a project and its files
    Delete {
        /// Project ID
        id: Uuid,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    // Create data directory if it doesn't exist
    std::fs::create_dir_all(&config.data_dir).unwrap_or_else(|e| {
        eprintln!("Error: Failed to create data directory: {}", e);
        std::process::exit(1);
    });

    let backend = SupabaseBackend::from_config(&config);
    let session_store = JsonSessionStore::new(config.session_path());

    let session = match session_store.load() {
        Ok(session) => session,
        Err(e) => {
            warn!(error = %e, "Ignoring unreadable session");
            None
        }
    };

    match cli.command {
        None => explore(&backend, &[], &[]),
        Some(Commands::Explore { filter, clear }) => explore(&backend, &filter, &clear),
        Some(Commands::Filters) => {
            let projects = load_projects(&backend);
            ui::render_filter_catalog(&projects);
        }
        Some(Commands::Tags) => {
            let projects = load_projects(&backend);
            ui::render_tag_counts(&projects);
        }
        Some(Commands::Show { id }) => {
            let project = find_project(&backend, id);
            let image_url = backend.public_url(Bucket::Images, &project.image_path);
            let is_admin = current_admin(&backend, session.as_ref()).is_some();
            ui::render_project_detail(&project, &image_url, is_admin);
        }
        Some(Commands::Pattern { id }) => {
            match pattern_download_url(&backend, id, config.signed_url_ttl) {
                Ok(url) => {
                    println!("{}", url);
                    println!(
                        "  {}",
                        format!("Link expires in {} seconds", config.signed_url_ttl).dimmed()
                    );
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Login { email, password }) => {
            let params = SignInParameters { email, password };

            match sign_in(&backend, &session_store, params) {
                Ok(session) => {
                    println!("✓ Signed in");
                    println!("  {}", display_user(&session));
                }
                Err(SignInError::MissingCredentials) => {
                    eprintln!("Error: Email and password are required.");
                    eprintln!("\nUsage: stitch login --email <EMAIL> --password <PASSWORD>");
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Logout) => match sign_out(&backend, &session_store) {
            Ok(Some(_)) => println!("✓ Signed out"),
            Ok(None) => println!("Not signed in"),
            Err(e) => {
                eprintln!("Error: Failed to sign out: {}", e);
                std::process::exit(1);
            }
        },
        Some(Commands::Whoami) => match (&session, current_admin(&backend, session.as_ref())) {
            (Some(session), Some(_)) => println!("Signed in as {}", display_user(session)),
            (Some(_), None) => println!("Session expired, sign in again with `stitch login`"),
            (None, _) => println!("Not signed in"),
        },
        Some(Commands::Admin(command)) => admin(&backend, session.as_ref(), command),
        Some(Commands::Serve { port }) => {
            let mut config = config;
            if let Some(port) = port {
                config.port = port;
            }

            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(e) => {
                    eprintln!("Error: Failed to start runtime: {}", e);
                    std::process::exit(1);
                }
            };

            if let Err(e) = runtime.block_on(server::start_server(backend, &config)) {
                eprintln!("Error: Server failed: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn explore(backend: &impl Backend, filters: &[String], clear: &[String]) {
    let state = match state_from_selections(filters) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("\nAvailable categories:");
            for category in FILTER_CATEGORIES {
                eprintln!("  - {} ({})", category.key, category.label);
            }
            eprintln!("\nRun `stitch filters` to see every option.");
            std::process::exit(1);
        }
    };

    let state = clear.iter().fold(state, |state, key| {
        state.clear_category(&key.trim().to_lowercase())
    });

    let projects = load_projects(backend);
    if projects.is_empty() {
        println!("No projects yet.");
        return;
    }

    let visible = apply_filters(&projects, &state);

    ui::render_filter_bar(&state);
    if visible.is_empty() {
        println!("\nNo projects match these filters.");
        return;
    }

    let title = if state.has_active_filters() {
        "Matching"
    } else {
        "Gallery"
    };
    ui::render_view_header(title, visible.len());
    ui::render_gallery(&visible);
}

fn admin(backend: &impl Backend, session: Option<&Session>, command: AdminCommands) {
    match command {
        AdminCommands::List => {
            if current_admin(backend, session).is_none() {
                exit_unauthorized();
            }

            let projects = load_projects(backend);
            if projects.is_empty() {
                println!("No projects yet.");
            } else {
                ui::render_admin_table(&projects);
            }
        }
        AdminCommands::New {
            name,
            description,
            tags,
            image,
            pattern,
        } => {
            let params = CreateProjectParameters {
                name,
                description,
                tags,
                image: Some(read_upload(&image)),
                pattern: pattern.as_deref().map(read_upload),
            };

            match create_project(backend, session, params) {
                Ok(project) => {
                    println!("✓ Project added: {}", project.name);
                    println!("  {}", project.id);
                }
                Err(CreateProjectError::Auth(AuthError::Unauthorized)) => exit_unauthorized(),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        AdminCommands::Edit {
            id,
            name,
            description,
            tags,
            image,
            pattern,
        } => {
            let params = UpdateProjectParameters {
                id,
                name,
                description,
                tags,
                image: image.as_deref().map(read_upload),
                pattern: pattern.as_deref().map(read_upload),
            };

            match update_project(backend, session, params) {
                Ok(project) => {
                    println!("✓ Project updated: {}", project.name);
                    println!("  {}", project.id);
                }
                Err(UpdateProjectError::Auth(AuthError::Unauthorized)) => exit_unauthorized(),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        AdminCommands::Delete { id } => {
            let params = DeleteProjectParameters { id };

            match delete_project(backend, session, params) {
                Ok(project) => {
                    println!("✓ Project deleted: {}", project.name);
                }
                Err(DeleteProjectError::Auth(AuthError::Unauthorized)) => exit_unauthorized(),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}

fn load_projects(backend: &impl Backend) -> Vec<Project> {
    match list_projects(backend) {
        Ok(projects) => projects,
        Err(e) => {
            eprintln!("Error: Failed to load projects: {}", e);
            std::process::exit(1);
        }
    }
}

fn find_project(backend: &impl Backend, id: Uuid) -> Project {
    match get_project(backend, id) {
        Ok(project) => project,
        Err(GetProjectError::ProjectNotFound(id)) => {
            eprintln!("Error: Project '{}' not found", id);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn read_upload(path: &Path) -> UploadFile {
    match UploadFile::from_path(path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Error: Failed to read '{}': {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

fn display_user(session: &Session) -> String {
    session
        .user
        .email
        .clone()
        .unwrap_or_else(|| session.user.id.to_string())
}

fn exit_unauthorized() -> ! {
    eprintln!("Error: Unauthorized");
    eprintln!("\nSign in first with `stitch login --email <EMAIL> --password <PASSWORD>`.");
    std::process::exit(1);
}
