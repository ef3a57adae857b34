//! User-facing message catalogue with per-chat locale fallback.
//!
//! Lookup tries the chat's locale first and falls back to English for
//! keys a locale does not translate. Templates carry `{placeholder}`
//! markers filled in by callers.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsgKey {
    Welcome,
    AuthRequired,
    AlreadyAuthorized,
    AskUsername,
    UserNotFound,
    AskPostingKey,
    WrongKey,
    LoggedIn,
    LoggedOut,
    Info,
    UserInfo,
    NoPhotos,
    VoteSent,
    PostNotFound,
    AlreadyVoted,
    AskComment,
    CommentSent,
    TitleRequired,
    PostAdded,
    PostFailed,
    ActionFailed,
    Help,
}

pub fn text(locale: Option<&str>, key: MsgKey) -> &'static str {
    if let Some(locale) = locale {
        let lang = locale.split('-').next().unwrap_or(locale);
        if lang != "en" {
            if let Some(translated) = localized(lang, key) {
                return translated;
            }
        }
    }
    english(key)
}

fn english(key: MsgKey) -> &'static str {
    use MsgKey::*;
    match key {
        Welcome => {
            "Welcome to Photon! Share photos, reward the ones you love \
             and earn rewards for your own."
        }
        AuthRequired => "You need to log in with your Photon account first.",
        AlreadyAuthorized => "You are already logged in as {username}.",
        AskUsername => "What is your Photon username?",
        UserNotFound => "I could not find that account. What is your Photon username?",
        AskPostingKey => {
            "Now send me your private posting key. I keep it only in this \
             chat so I can sign actions on your behalf."
        }
        WrongKey => "That posting key did not match the account. Please log in again.",
        LoggedIn => "You are logged in as {username}.",
        LoggedOut => "You are logged out. Your posting key message was left above.",
        Info => {
            "Use the buttons below to browse photos. Send me a photo with a \
             caption to post it, last words starting with # become tags."
        }
        UserInfo => "Logged in as {username}. Your posting key is in the quoted message.",
        NoPhotos => "No photos in {source} right now, try again later.",
        VoteSent => "Upvoted!",
        PostNotFound => "This post is no longer available.",
        AlreadyVoted => "You have already voted for this post.",
        AskComment => "Send me the text of your comment.",
        CommentSent => "Comment added.",
        TitleRequired => "Every photo needs a title. Send me one for this photo.",
        PostAdded => "Your photo was posted.",
        PostFailed => "I could not post your photo: {reason}",
        ActionFailed => "Something went wrong, please try again later.",
        Help => {
            "Send /start to open the menu. Browse Feed, New, Hot and Top, \
             upvote and comment on photos with the buttons under each one, \
             and send a captioned photo to post it."
        }
    }
}

fn localized(lang: &str, key: MsgKey) -> Option<&'static str> {
    use MsgKey::*;
    match lang {
        "es" => Some(match key {
            Welcome => {
                "Bienvenido a Photon! Comparte fotos, premia las que te \
                 gusten y gana recompensas por las tuyas."
            }
            AuthRequired => "Primero tienes que iniciar sesion con tu cuenta de Photon.",
            AskUsername => "Cual es tu nombre de usuario de Photon?",
            AskPostingKey => {
                "Ahora enviame tu clave privada de publicacion. La guardo \
                 solo en este chat para firmar acciones en tu nombre."
            }
            LoggedIn => "Has iniciado sesion como {username}.",
            NoPhotos => "No hay fotos en {source} por ahora, intenta mas tarde.",
            _ => return None,
        }),
        _ => None,
    }
}
